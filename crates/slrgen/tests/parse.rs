use slrgen::{
    grammar::{Grammar, NonterminalID, Rule, SymbolID::*},
    lr0::StateID,
    types::Map,
    ParsingTable,
};
use slrgen_runtime::ParseError;
use std::{env, path::PathBuf};

fn load(name: &str) -> Grammar {
    let path = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .join("tests")
        .join(format!("{}.grammar", name));
    Grammar::from_file(path).unwrap()
}

fn table(name: &str) -> ParsingTable {
    slrgen::build_table(&load(name)).unwrap()
}

fn tokens(input: &str) -> Vec<&str> {
    input.split_whitespace().collect()
}

#[test]
fn expression_tree() {
    let table = table("expression");
    let tree = table.parse(tokens("id + id * id")).unwrap();
    assert_eq!(
        tree.sexp().to_string(),
        "S(E(E(T(F(id))), +, T(T(F(id)), *, F(id))))"
    );
}

#[test]
fn expression_tree_drawing() {
    let table = table("expression");
    let tree = table.parse(tokens("id * id")).unwrap();
    let expected = "\
S
└── E
    └── T
        ├── T
        │   └── F
        │       └── id
        ├── *
        └── F
            └── id
";
    assert_eq!(tree.to_string(), expected);
}

#[test]
fn leaves_match_the_input() {
    let table = table("arithmetic");
    let inputs = [
        "INT",
        "FLOAT PLUS INT",
        "COS COS INT FACTORIAL FACTORIAL",
        "INT MULT FLOAT MINUS COS INT PLUS INT FACTORIAL",
        "INT MINUS INT MINUS INT MULT INT MULT INT",
    ];
    for input in inputs {
        let tree = table.parse(tokens(input)).unwrap();
        assert_eq!(tree.symbol(), "E", "{}", input);
        let leaves: Vec<&str> = tree.leaves().copied().collect();
        assert_eq!(leaves, tokens(input), "{}", input);
    }
}

/// xorshift64, so that the generated sentences are reproducible.
struct Rng(u64);

impl Rng {
    fn below(&mut self, n: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % n as u64) as usize
    }
}

/// The smallest derivation tree height of every productive nonterminal.
fn min_heights(g: &Grammar) -> Map<NonterminalID, usize> {
    let mut heights = Map::default();
    let mut changed = true;
    while changed {
        changed = false;
        for rule in g.rules.values() {
            let Some(h) = rule_height(rule, &heights) else {
                continue;
            };
            match heights.get(&rule.left()) {
                Some(old) if *old <= h => (),
                _ => {
                    heights.insert(rule.left(), h);
                    changed = true;
                }
            }
        }
    }
    heights
}

fn rule_height(rule: &Rule, heights: &Map<NonterminalID, usize>) -> Option<usize> {
    let body = rule.right().iter().try_fold(0, |acc, symbol| match symbol {
        T(..) => Some(acc),
        N(n) => Some(acc.max(*heights.get(n)?)),
    })?;
    Some(body + 1)
}

const MAX_DEPTH: usize = 8;

/// Derive a random sentence; past `MAX_DEPTH` only the shallowest rules are taken.
fn derive<'g>(
    g: &'g Grammar,
    heights: &Map<NonterminalID, usize>,
    rng: &mut Rng,
    symbol: NonterminalID,
    depth: usize,
    sentence: &mut Vec<&'g str>,
) {
    let candidates: Vec<&Rule> = g
        .rules_of(symbol)
        .filter(|rule| match rule_height(rule, heights) {
            Some(h) => depth < MAX_DEPTH || Some(&h) == heights.get(&symbol),
            None => false,
        })
        .collect();
    let rule = candidates[rng.below(candidates.len())];
    for symbol in rule.right() {
        match symbol {
            T(t) => sentence.push(g.terminals[t].name()),
            N(n) => derive(g, heights, rng, *n, depth + 1, sentence),
        }
    }
}

#[test]
fn generated_sentences_round_trip() {
    let names = [
        "arithmetic",
        "expression",
        "lists",
        "optional",
        "parenthesized",
        "statements",
    ];
    for name in names {
        let g = load(name);
        let table = slrgen::build_table(&g).unwrap();
        let heights = min_heights(&g);
        let mut rng = Rng(0x2545_f491_4f6c_dd1d);

        for _ in 0..300 {
            let mut sentence = vec![];
            derive(&g, &heights, &mut rng, g.start_symbol, 0, &mut sentence);

            let tree = table
                .parse(sentence.iter().copied())
                .unwrap_or_else(|err| panic!("{}: {:?} was rejected: {}", name, sentence, err));
            let start = g.nonterminals[&g.start_symbol].name();
            assert_eq!(tree.symbol(), start, "{}: {:?}", name, sentence);
            let leaves: Vec<&str> = tree.leaves().copied().collect();
            assert_eq!(leaves, sentence, "{}", name);
        }
    }
}

#[test]
fn cyclic_grammar_is_rejected_before_parsing() {
    let g: Grammar = "S, A\nx\nA -> A | x\nS -> A\n".parse().unwrap();
    let err = slrgen::build_table(&g).unwrap_err();
    assert!(matches!(err, slrgen::TableError::Cyclic(..)), "{}", err);
}

#[test]
fn unexpected_token() {
    let table = table("expression");
    let err = table.parse(tokens("id + + id")).unwrap_err();
    match &err {
        ParseError::UnexpectedToken { states, token } => {
            assert_eq!(*token, "+");
            assert_eq!(states.first(), Some(&table.start_state()));
            assert_eq!(states.len(), 3);
        }
        err => panic!("unexpected error: {:?}", err),
    }
    assert_eq!(err.token(), Some(&"+"));
}

#[test]
fn unexpected_end_of_input() {
    let table = table("expression");
    for input in ["", "id +", "id * id +"] {
        let err = table.parse(tokens(input)).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEOI { .. }), "{:?}", input);
        assert_eq!(err.token(), None);
        assert!(!err.states().is_empty());
    }
}

#[test]
fn unknown_terminal_is_rejected() {
    let table = table("expression");
    let err = table.parse(tokens("id - id")).unwrap_err();
    assert_eq!(err.token(), Some(&"-"));

    // the end-of-input marker is not a token
    let err = table.parse(tokens("id $")).unwrap_err();
    assert_eq!(err.token(), Some(&"$"));
}

#[test]
fn epsilon_production() {
    let table = table("optional");
    let tree = table.parse(tokens("a c")).unwrap();
    assert_eq!(tree.sexp().to_string(), "S(a, B(), c)");
    let tree = table.parse(tokens("a b c")).unwrap();
    assert_eq!(tree.sexp().to_string(), "S(a, B(b), c)");
}

#[test]
fn nested_lists() {
    let table = table("lists");
    let tree = table
        .parse(tokens("lbrack x comma lbrack rbrack comma x rbrack"))
        .unwrap();
    assert_eq!(
        tree.sexp().to_string(),
        concat!(
            "List(lbrack, Elems(Elems(Elems(Elem(x)), comma, ",
            "Elem(List(lbrack, Elems(), rbrack))), comma, Elem(x)), rbrack)"
        )
    );
}

#[test]
fn empty_program() {
    let table = table("statements");
    let tree = table.parse(Vec::<&str>::new()).unwrap();
    assert_eq!(tree.sexp().to_string(), "Program(Stmts())");

    let tree = table
        .parse(tokens("id assign num semi print id semi"))
        .unwrap();
    assert_eq!(tree.children()[0].children().len(), 2);
}

#[test]
fn table_is_deterministic() {
    let g = load("parenthesized");
    let t1 = slrgen::build_table(&g).unwrap();
    let t2 = slrgen::build_table(&g).unwrap();
    assert_eq!(t1.start_state(), t2.start_state());
    assert_eq!(t1.to_string(), t2.to_string());
}

#[test]
fn loader_matches_programmatic_definition() {
    let defined = Grammar::define(|g| {
        let s = g.nonterminal("S")?;
        let e = g.nonterminal("E")?;
        let t = g.nonterminal("T")?;
        let f = g.nonterminal("F")?;
        let id = g.terminal("id")?;
        let plus = g.terminal("+")?;
        let star = g.terminal("*")?;
        g.rule(s, [N(e)])?;
        g.rule(e, [N(e), T(plus), N(t)])?;
        g.rule(e, [N(t)])?;
        g.rule(t, [N(t), T(star), N(f)])?;
        g.rule(t, [N(f)])?;
        g.rule(f, [T(id)])?;
        Ok(())
    })
    .unwrap();

    let loaded = slrgen::build_table(&load("expression")).unwrap();
    let defined = slrgen::build_table(&defined).unwrap();
    assert_eq!(loaded.to_string(), defined.to_string());
}

#[test]
fn dangling_else_is_denied() {
    let g = load("dangling_else");
    let err = slrgen::Config::new()
        .deny_conflicts(true)
        .build(&g)
        .unwrap_err();
    assert!(matches!(err, slrgen::TableError::Conflicts(..)));
}

#[test]
fn concurrent_parses_share_one_table() {
    let table = table("parenthesized");
    let inputs = ["id", "( id + id ) * id", "id * ( id )", "( ( id ) )"];
    std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| {
                let table = &table;
                s.spawn(move || table.parse(tokens(input)).map(|tree| tree.sexp().to_string()))
            })
            .collect();
        for (handle, input) in handles.into_iter().zip(inputs) {
            let sexp = handle.join().unwrap();
            assert!(sexp.is_ok(), "{}", input);
        }
    });
}

#[test]
fn states_in_errors_are_table_states() {
    let table = table("expression");
    let err = table.parse(tokens("id id")).unwrap_err();
    let states: &[StateID] = err.states();
    assert!(states.iter().all(|s| table.row(*s).is_some()));
}
