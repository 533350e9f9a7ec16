//! Parsing of monitor capabilities strings.
//!
//! A capabilities string is a space separated list of tokens where any token
//! may be followed by a parenthesized group of the same form, e.g.
//! `vcp(02 04 05 10(01 02) 12) cmds(01 02 03)`. Monitor firmware is sloppy
//! about the format so parsing never fails. Unbalanced parentheses and stray
//! spaces produce a best-effort tree instead of an error.

use std::{fmt, mem};

use logos::Logos;

#[derive(Clone, Copy, Debug, Logos, PartialEq)]
enum Lexeme<'s> {
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(" ")]
    Space,

    #[regex("[^() ]+", |lex| lex.slice())]
    Text(&'s str),
}

/// A raw token and the tokens of the group that directly follows it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub children: Vec<Token>,
}

impl Token {
    fn is_empty(&self) -> bool {
        self.value.is_empty() && self.children.is_empty()
    }
}

/// Writes the token back in capabilities string form.
///
/// A token that ends in a group is not followed by a separator, every other
/// token except the last in its group is followed by a space.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)?;
        if !self.children.is_empty() {
            f.write_str("(")?;
            write_group(f, &self.children)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

fn write_group(f: &mut impl fmt::Write, tokens: &[Token]) -> fmt::Result {
    for (i, token) in tokens.iter().enumerate() {
        write!(f, "{}", token)?;
        if token.children.is_empty() && i + 1 < tokens.len() {
            f.write_str(" ")?;
        }
    }
    Ok(())
}

/// Writes a token forest back in capabilities string form.
pub fn to_source(tokens: &[Token]) -> String {
    let mut source = String::new();
    // Writing to a String can't fail.
    let _ = write_group(&mut source, tokens);
    source
}

/// A group that's still being filled.
#[derive(Default)]
struct Group {
    tokens: Vec<Token>,
    current: Token,
}

impl Group {
    fn push_current(&mut self) {
        let token = mem::take(&mut self.current);
        self.tokens.push(token);
    }

    /// Ends the group at end of input. Only a builder that holds something is
    /// kept.
    fn finish(mut self) -> Vec<Token> {
        if !self.current.is_empty() {
            self.push_current();
        }
        self.tokens
    }
}

/// How many groups may be open at once. Anything nested deeper is kept as
/// the text of the innermost token instead of becoming a subtree.
pub const MAX_DEPTH: usize = 32;

/// Splits a capabilities string into a forest of tokens.
///
/// Every space and every `)` ends the token being built, even an empty one,
/// so `"a  b"` has an empty token between `a` and `b`. A `(` attaches the
/// group that follows to the token being built. A `)` without a matching `(`
/// ends tokenizing, and groups still open at the end of input are closed
/// implicitly. Groups nested more than [`MAX_DEPTH`] deep are not split up,
/// their source text is appended to the enclosing token as is.
pub fn tokenize(s: &str) -> Vec<Token> {
    let mut groups = vec![Group::default()];
    // Number of '(' seen past MAX_DEPTH that are still open.
    let mut overflow = 0usize;

    for (lexeme, span) in Lexeme::lexer(s).spanned() {
        // Every input matches one of the lexemes, but an error still only
        // means "not a separator".
        let lexeme = lexeme.unwrap_or(Lexeme::Text(&s[span.clone()]));

        if overflow > 0 || (lexeme == Lexeme::LeftParen && groups.len() > MAX_DEPTH) {
            match lexeme {
                Lexeme::LeftParen => overflow += 1,
                Lexeme::RightParen => overflow -= 1,
                _ => {}
            }
            if let Some(group) = groups.last_mut() {
                group.current.value.push_str(&s[span]);
            }
            continue;
        }

        match lexeme {
            Lexeme::LeftParen => groups.push(Group::default()),
            Lexeme::RightParen => {
                let mut group = groups.pop().unwrap_or_default();
                group.push_current();
                match groups.last_mut() {
                    Some(parent) => {
                        parent.current.children = group.tokens;
                        parent.push_current();
                    }
                    // Unbalanced ')' at the top level.
                    None => return group.tokens,
                }
            }
            Lexeme::Space => {
                if let Some(group) = groups.last_mut() {
                    group.push_current();
                }
            }
            Lexeme::Text(text) => {
                if let Some(group) = groups.last_mut() {
                    group.current.value.push_str(text);
                }
            }
        }
    }

    let mut tokens = Vec::new();
    while let Some(group) = groups.pop() {
        tokens = group.finish();
        if let Some(parent) = groups.last_mut() {
            parent.current.children = mem::take(&mut tokens);
            parent.push_current();
        }
    }
    tokens
}

/// The value of a capabilities tree node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Opcode(u8),
}

impl Value {
    /// Classifies a token. Exactly two hex digits is an opcode, anything else
    /// is kept as text.
    fn classify(s: &str) -> Value {
        let bytes = s.as_bytes();
        if bytes.len() == 2 && bytes.iter().all(u8::is_ascii_hexdigit) {
            if let Ok(code) = u8::from_str_radix(s, 16) {
                return Value::Opcode(code);
            }
        }
        Value::Text(s.to_owned())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Opcode(_) => None,
        }
    }

    pub fn as_opcode(&self) -> Option<u8> {
        match self {
            Value::Opcode(code) => Some(*code),
            Value::Text(_) => None,
        }
    }
}

/// A node in a parsed capabilities tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapabilityNode {
    Leaf(Value),
    Branch {
        value: Value,
        children: Vec<CapabilityNode>,
    },
}

impl CapabilityNode {
    pub fn value(&self) -> &Value {
        match self {
            CapabilityNode::Leaf(value) => value,
            CapabilityNode::Branch { value, .. } => value,
        }
    }

    /// The node's children in source order. Empty for leaves.
    pub fn children(&self) -> &[CapabilityNode] {
        match self {
            CapabilityNode::Leaf(_) => &[],
            CapabilityNode::Branch { children, .. } => children,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, CapabilityNode::Branch { .. })
    }

    /// Returns the first branch, in depth-first order starting with this
    /// node, whose text value is `name`.
    pub fn find(&self, name: &str) -> Option<&CapabilityNode> {
        if self.is_branch() && self.value().as_text() == Some(name) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(name))
    }
}

impl From<&Token> for CapabilityNode {
    fn from(token: &Token) -> CapabilityNode {
        let value = Value::classify(&token.value);
        if token.children.is_empty() {
            CapabilityNode::Leaf(value)
        } else {
            CapabilityNode::Branch {
                value,
                children: token
                    .children
                    .iter()
                    .map(CapabilityNode::from)
                    .collect(),
            }
        }
    }
}

/// Parses a capabilities string into its top-level nodes.
///
/// A string made only of spaces has no content and yields no nodes.
pub fn parse(s: &str) -> Vec<CapabilityNode> {
    if s.bytes().all(|b| b == b' ') {
        return Vec::new();
    }
    tokenize(s).iter().map(CapabilityNode::from).collect()
}

/// Parses a capabilities string and returns its first top-level node.
pub fn parse_root(s: &str) -> Option<CapabilityNode> {
    parse(s).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(value: &str) -> Token {
        Token {
            value: value.to_owned(),
            children: Vec::new(),
        }
    }

    fn branch(value: &str, children: Vec<Token>) -> Token {
        Token {
            value: value.to_owned(),
            children,
        }
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_owned())
    }

    #[test]
    fn empty() {
        assert!(tokenize("").is_empty());
        assert!(parse("").is_empty());
        assert_eq!(parse_root(""), None);
    }

    #[test]
    fn spaces_only() {
        assert_eq!(tokenize("   "), vec![leaf(""), leaf(""), leaf("")]);
        assert!(parse("   ").is_empty());
    }

    #[test]
    fn trailing_token_is_kept() {
        assert_eq!(tokenize("01 02"), vec![leaf("01"), leaf("02")]);
        assert_eq!(tokenize("mswhql"), vec![leaf("mswhql")]);
    }

    #[test]
    fn nested_groups() {
        assert_eq!(
            tokenize("vcp(02 04 05 10(01 02) 12) cmds(01 02 03)"),
            vec![
                branch(
                    "vcp",
                    vec![
                        leaf("02"),
                        leaf("04"),
                        leaf("05"),
                        branch("10", vec![leaf("01"), leaf("02")]),
                        leaf(""),
                        leaf("12"),
                    ]
                ),
                leaf(""),
                branch("cmds", vec![leaf("01"), leaf("02"), leaf("03")]),
            ]
        );
    }

    #[test]
    fn space_before_paren() {
        assert_eq!(
            tokenize("60( 11 12 0F)"),
            vec![branch(
                "60",
                vec![leaf(""), leaf("11"), leaf("12"), leaf("0F")]
            )]
        );
        assert_eq!(
            tokenize("DC(00 02 )"),
            vec![branch("DC", vec![leaf("00"), leaf("02"), leaf("")])]
        );
        assert_eq!(
            tokenize("a (b)"),
            vec![leaf("a"), branch("", vec![leaf("b")])]
        );
    }

    #[test]
    fn right_paren_after_group() {
        assert_eq!(
            tokenize("vcp(60(0F 11))"),
            vec![branch(
                "vcp",
                vec![branch("60", vec![leaf("0F"), leaf("11")]), leaf("")]
            )]
        );
    }

    #[test]
    fn group_without_name() {
        assert_eq!(
            tokenize("(prot(monitor)type(lcd))"),
            vec![branch(
                "",
                vec![
                    branch("prot", vec![leaf("monitor")]),
                    branch("type", vec![leaf("lcd")]),
                    leaf(""),
                ]
            )]
        );
    }

    #[test]
    fn empty_group() {
        assert_eq!(tokenize("a()"), vec![branch("a", vec![leaf("")])]);
    }

    #[test]
    fn unmatched_left_paren_runs_to_end() {
        assert_eq!(
            tokenize("vcp(02 04"),
            vec![branch("vcp", vec![leaf("02"), leaf("04")])]
        );
        assert_eq!(
            tokenize("(vcp(01"),
            vec![branch("", vec![branch("vcp", vec![leaf("01")])])]
        );
    }

    #[test]
    fn unmatched_right_paren_ends_input() {
        assert_eq!(tokenize("01 02) 03"), vec![leaf("01"), leaf("02")]);
        assert_eq!(tokenize(")01"), vec![leaf("")]);
    }

    fn depth(tokens: &[Token]) -> usize {
        let mut depth = 0;
        let mut level = tokens;
        while let Some(token) = level.iter().find(|t| !t.children.is_empty()) {
            depth += 1;
            level = &token.children;
        }
        depth
    }

    #[test]
    fn deep_nesting_is_kept_as_text() {
        let source = format!("vcp{}01{}", "(".repeat(40), ")".repeat(40));
        let tokens = tokenize(&source);
        assert_eq!(depth(&tokens), MAX_DEPTH);
        assert_eq!(to_source(&tokens), source);

        let mut innermost = &tokens[0];
        while let Some(child) = innermost.children.first() {
            innermost = child;
        }
        assert_eq!(
            innermost.value,
            format!("{}01{}", "(".repeat(8), ")".repeat(8))
        );
    }

    #[test]
    fn very_deep_nesting() {
        let source = "(".repeat(100_000);
        let nodes = parse(&source);
        assert_eq!(nodes.len(), 1);

        let mut node = &nodes[0];
        let mut depth = 0;
        while let Some(child) = node.children().first() {
            node = child;
            depth += 1;
        }
        assert_eq!(depth, MAX_DEPTH);
        assert_eq!(
            node.value(),
            &Value::Text("(".repeat(100_000 - MAX_DEPTH))
        );
    }

    #[test]
    fn opcode_classification() {
        assert_eq!(Value::classify("0F"), Value::Opcode(0x0F));
        assert_eq!(Value::classify("0f"), Value::Opcode(0x0F));
        assert_eq!(Value::classify("ff"), Value::Opcode(0xFF));
        assert_eq!(Value::classify("00"), Value::Opcode(0x00));
        assert_eq!(Value::classify("0G"), text("0G"));
        assert_eq!(Value::classify("100"), text("100"));
        assert_eq!(Value::classify("F"), text("F"));
        assert_eq!(Value::classify(""), text(""));
        assert_eq!(Value::classify("2.1"), text("2.1"));
        // Two bytes, but not two ASCII hex digits.
        assert_eq!(Value::classify("é"), text("é"));
    }

    #[test]
    fn display_round_trip() {
        for source in [
            "vcp(02 04 05 10(01 02) 12) cmds(01 02 03)",
            "(prot(monitor)type(lcd)UN880cmds(01 02 03 0C E3 F3)vcp(02 04 05 08 10 12 14(05 08 0B ) 16 18 1A 52 60( 11 12 0F 00) AC AE)mccs_ver(2.1)mswhql(1))",
            "vcp(02 60(0F 11)) cmds(01)",
        ] {
            assert_eq!(to_source(&tokenize(source)), source);
        }
    }

    #[test]
    fn find_branch() {
        let root = parse_root("(prot(monitor)vcp(02 60(0F 11))mccs_ver(2.1))")
            .unwrap();
        let vcp = root.find("vcp").unwrap();
        // 02, 60 and the empty token closed by the final ')'.
        assert_eq!(vcp.children().len(), 3);
        assert_eq!(vcp.children()[1].children().len(), 2);
        assert_eq!(root.find("prot").unwrap().children().len(), 1);
        assert!(root.find("cmds").is_none());
        // Leaves never match.
        assert!(root.find("monitor").is_none());
    }

    #[test]
    fn parse_tree() {
        let nodes = parse("vcp(02 60(0F 11)) cmds(01)");
        insta::assert_debug_snapshot!(nodes, @r###"
        [
            Branch {
                value: Text(
                    "vcp",
                ),
                children: [
                    Leaf(
                        Opcode(
                            2,
                        ),
                    ),
                    Branch {
                        value: Opcode(
                            96,
                        ),
                        children: [
                            Leaf(
                                Opcode(
                                    15,
                                ),
                            ),
                            Leaf(
                                Opcode(
                                    17,
                                ),
                            ),
                        ],
                    },
                    Leaf(
                        Text(
                            "",
                        ),
                    ),
                ],
            },
            Leaf(
                Text(
                    "",
                ),
            ),
            Branch {
                value: Text(
                    "cmds",
                ),
                children: [
                    Leaf(
                        Opcode(
                            1,
                        ),
                    ),
                ],
            },
        ]
        "###);
    }
}
