use logos::Logos;
use std::fmt;

/// Why a piece of input could not be scanned.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub enum ScanError {
    #[default]
    InvalidInput,
    IntegerOutOfRange,
}

/// Tokens of the calculator expressions.
#[derive(Debug, Copy, Clone, Logos, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(error = ScanError)]
pub enum Token {
    #[token("cos")]
    Cos,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().map_err(|_| ScanError::IntegerOutOfRange))]
    Int(i64),

    // `1.` is a float as well
    #[regex(r"[0-9]+\.[0-9]*", |lex| lex.slice().parse().ok())]
    Float(f64),

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Mult,

    #[token("!")]
    Factorial,
}

impl slrgen_runtime::Token for Token {
    fn name(&self) -> &str {
        match self {
            Self::Cos => "COS",
            Self::Int(..) => "INT",
            Self::Float(..) => "FLOAT",
            Self::Plus => "PLUS",
            Self::Minus => "MINUS",
            Self::Mult => "MULT",
            Self::Factorial => "FACTORIAL",
        }
    }
}

// `< NAME, value >`
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use slrgen_runtime::Token as _;
        match self {
            Self::Cos => write!(f, "< {}, cos >", self.name()),
            Self::Int(n) => write!(f, "< {}, {} >", self.name(), n),
            Self::Float(x) => write!(f, "< {}, {:?} >", self.name(), x),
            Self::Plus => write!(f, "< {}, + >", self.name()),
            Self::Minus => write!(f, "< {}, - >", self.name()),
            Self::Mult => write!(f, "< {}, * >", self.name()),
            Self::Factorial => write!(f, "< {}, ! >", self.name()),
        }
    }
}

/// Scan the whole input into a token sequence.
pub fn tokenize(input: &str) -> anyhow::Result<Vec<Token>> {
    let mut lexer = Token::lexer(input);
    let mut tokens = vec![];
    while let Some(res) = lexer.next() {
        match res {
            Ok(token) => tokens.push(token),
            Err(ScanError::InvalidInput) => anyhow::bail!(
                "invalid input {:?} at offset {}",
                lexer.slice(),
                lexer.span().start
            ),
            Err(ScanError::IntegerOutOfRange) => anyhow::bail!(
                "integer {} at offset {} is out of range",
                lexer.slice(),
                lexer.span().start
            ),
        }
    }
    Ok(tokens)
}
