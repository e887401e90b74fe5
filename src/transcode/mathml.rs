//! Presentation MathML rendering.
//!
//! The direct-markup formats get away with flat rewrite rules because their
//! targets are themselves flat text. MathML is nested markup: a regex chain
//! that emits tags and then rewrites letters corrupts its own output. So
//! this module parses the expression into a small tree and renders it with
//! a visitor — the robustness upgrade the rule-chain contract explicitly
//! permits, with the fixture outputs unchanged.
//!
//! The renderer always produces exactly one balanced `<math>…</math>`
//! element in display mode. Input it cannot parse (unknown command,
//! unbalanced groups) falls back to an `<mtext>` wrapper around the
//! escaped source — degraded, never absent. No semantics/annotation
//! wrapper re-embedding the source LaTeX is emitted.
//!
//! Two pre-passes run before parsing:
//! * macro expansion for the blackboard-bold shorthands `\R \N \Z \Q \C`;
//! * bare `\\` line breaks outside a recognized multi-line environment are
//!   wrapped in `aligned`, since an unguarded line break is invalid in
//!   display math.

use super::xml::xml_escape;
use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// Environments whose bodies may legally contain `\\` line breaks.
const MULTILINE_ENVS: &[&str] = &[
    "aligned", "align", "align*", "gather", "gather*", "cases", "matrix", "pmatrix", "bmatrix",
    "vmatrix", "Vmatrix", "smallmatrix", "split", "array", "equation", "equation*",
];

// ── Tree ─────────────────────────────────────────────────────────────────

/// One node of the parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MathNode {
    Row(Vec<MathNode>),
    Ident(String),
    Num(String),
    Op(String),
    Text(String),
    Space(&'static str),
    Frac(Box<MathNode>, Box<MathNode>),
    Sqrt(Box<MathNode>),
    Root(Box<MathNode>, Box<MathNode>),
    Sub(Box<MathNode>, Box<MathNode>),
    Sup(Box<MathNode>, Box<MathNode>),
    SubSup(Box<MathNode>, Box<MathNode>, Box<MathNode>),
    Fenced(String, String, Box<MathNode>),
    Table(Vec<Vec<MathNode>>),
}

fn row(mut nodes: Vec<MathNode>) -> MathNode {
    if nodes.len() == 1 {
        nodes.pop().unwrap()
    } else {
        MathNode::Row(nodes)
    }
}

/// Parse failure; callers fall back to the `<mtext>` wrapper.
#[derive(Debug)]
pub(crate) struct ParseError(pub String);

// ── Pre-passes ───────────────────────────────────────────────────────────

static MACRO_R: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\R([^a-zA-Z]|$)").unwrap());
static MACRO_N: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\N([^a-zA-Z]|$)").unwrap());
static MACRO_Z: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\Z([^a-zA-Z]|$)").unwrap());
static MACRO_Q: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\Q([^a-zA-Z]|$)").unwrap());
static MACRO_C: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\C([^a-zA-Z]|$)").unwrap());

/// Expand the fixed blackboard-bold macro table.
fn expand_macros(latex: &str) -> String {
    let s = MACRO_R.replace_all(latex, "\\mathbb{R}${1}");
    let s = MACRO_N.replace_all(&s, "\\mathbb{N}${1}");
    let s = MACRO_Z.replace_all(&s, "\\mathbb{Z}${1}");
    let s = MACRO_Q.replace_all(&s, "\\mathbb{Q}${1}");
    MACRO_C.replace_all(&s, "\\mathbb{C}${1}").into_owned()
}

/// Wrap bare line breaks in an `aligned` environment.
fn wrap_bare_line_breaks(latex: &str) -> String {
    let has_break = latex.contains("\\\\");
    let has_multiline_env = MULTILINE_ENVS
        .iter()
        .any(|env| latex.contains(&format!("\\begin{{{env}}}")));
    if has_break && !has_multiline_env {
        format!("\\begin{{aligned}}{latex}\\end{{aligned}}")
    } else {
        latex.to_string()
    }
}

// ── Lexer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Command(String),
    Letter(char),
    Number(String),
    Symbol(char),
    OpenBrace,
    CloseBrace,
    Sup,
    Sub,
    Ampersand,
    NewRow,
}

fn lex(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ch if ch.is_whitespace() => {}
            '$' => {} // stray math delimiters carry no content
            '\\' => match chars.peek().copied() {
                Some('\\') => {
                    chars.next();
                    tokens.push(Token::NewRow);
                }
                Some(ch) if ch.is_ascii_alphabetic() => {
                    let mut name = String::new();
                    while let Some(&ch) = chars.peek() {
                        if ch.is_ascii_alphabetic() {
                            name.push(ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::Command(name));
                }
                Some(ch @ ('{' | '}' | '%' | '$' | '#' | '&' | '_')) => {
                    chars.next();
                    tokens.push(Token::Symbol(ch));
                }
                Some('|') => {
                    chars.next();
                    tokens.push(Token::Symbol('‖'));
                }
                Some(ch @ (',' | ';' | ':' | '!' | ' ')) => {
                    chars.next();
                    tokens.push(Token::Command(ch.to_string()));
                }
                Some(other) => {
                    return Err(ParseError(format!("unsupported escape '\\{other}'")));
                }
                None => return Err(ParseError("dangling backslash".into())),
            },
            '{' => tokens.push(Token::OpenBrace),
            '}' => tokens.push(Token::CloseBrace),
            '^' => tokens.push(Token::Sup),
            '_' => tokens.push(Token::Sub),
            '&' => tokens.push(Token::Ampersand),
            '0'..='9' => {
                let mut num = String::new();
                num.push(c);
                loop {
                    match chars.peek() {
                        Some(&d) if d.is_ascii_digit() => {
                            num.push(d);
                            chars.next();
                        }
                        Some('.') => {
                            // Consume the dot only when a digit follows.
                            let mut ahead = chars.clone();
                            ahead.next();
                            if matches!(ahead.peek(), Some(d) if d.is_ascii_digit()) {
                                num.push('.');
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        _ => break,
                    }
                }
                tokens.push(Token::Number(num));
            }
            ch if ch.is_alphabetic() => tokens.push(Token::Letter(ch)),
            other => tokens.push(Token::Symbol(other)),
        }
    }

    Ok(tokens)
}

// ── Symbol tables ────────────────────────────────────────────────────────

/// Commands rendered as `<mi>` identifiers.
fn ident_symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" | "varepsilon" => "ε",
        "zeta" => "ζ",
        "eta" => "η",
        "theta" | "vartheta" => "θ",
        "iota" => "ι",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "xi" => "ξ",
        "pi" => "π",
        "rho" | "varrho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "upsilon" => "υ",
        "phi" | "varphi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Xi" => "Ξ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Upsilon" => "Υ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        "infty" => "∞",
        "partial" => "∂",
        "nabla" => "∇",
        "emptyset" => "∅",
        "ell" => "ℓ",
        "hbar" => "ℏ",
        "imath" => "ı",
        _ => return None,
    })
}

/// Commands rendered as `<mo>` operators.
fn op_symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "sum" => "∑",
        "prod" => "∏",
        "int" => "∫",
        "oint" => "∮",
        "pm" => "±",
        "mp" => "∓",
        "times" => "×",
        "div" => "÷",
        "cdot" => "·",
        "ast" => "∗",
        "circ" => "∘",
        "bullet" => "•",
        "star" => "⋆",
        "oplus" => "⊕",
        "otimes" => "⊗",
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "equiv" => "≡",
        "sim" => "∼",
        "simeq" => "≃",
        "propto" => "∝",
        "ll" => "≪",
        "gg" => "≫",
        "rightarrow" | "to" => "→",
        "leftarrow" | "gets" => "←",
        "Rightarrow" | "implies" => "⇒",
        "Leftarrow" => "⇐",
        "leftrightarrow" => "↔",
        "Leftrightarrow" | "iff" => "⇔",
        "mapsto" => "↦",
        "forall" => "∀",
        "exists" => "∃",
        "neg" | "lnot" => "¬",
        "wedge" | "land" => "∧",
        "vee" | "lor" => "∨",
        "in" => "∈",
        "notin" => "∉",
        "ni" => "∋",
        "subset" => "⊂",
        "supset" => "⊃",
        "subseteq" => "⊆",
        "supseteq" => "⊇",
        "cup" => "∪",
        "cap" => "∩",
        "setminus" => "∖",
        "perp" => "⊥",
        "parallel" => "∥",
        "angle" => "∠",
        "mid" => "∣",
        "dagger" => "†",
        "prime" => "′",
        "therefore" => "∴",
        "because" => "∵",
        "cdots" => "⋯",
        "ldots" | "dots" | "dotsc" => "…",
        "vdots" => "⋮",
        "ddots" => "⋱",
        _ => return None,
    })
}

/// Function names rendered as upright identifiers.
fn function_name(name: &str) -> bool {
    matches!(
        name,
        "sin" | "cos" | "tan" | "cot" | "sec" | "csc" | "sinh" | "cosh" | "tanh" | "log" | "ln"
            | "exp" | "lim" | "limsup" | "liminf" | "max" | "min" | "sup" | "inf" | "det" | "gcd"
            | "arg" | "deg" | "dim" | "ker" | "mod"
    )
}

/// Blackboard-bold letters with dedicated code points.
fn double_struck(letter: &str) -> Option<&'static str> {
    Some(match letter {
        "R" => "ℝ",
        "N" => "ℕ",
        "Z" => "ℤ",
        "Q" => "ℚ",
        "C" => "ℂ",
        "H" => "ℍ",
        "P" => "ℙ",
        _ => return None,
    })
}

/// Delimiter commands usable after `\left`/`\right`.
fn delimiter_symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "langle" => "⟨",
        "rangle" => "⟩",
        "lvert" | "rvert" | "vert" => "|",
        "lVert" | "rVert" | "Vert" => "‖",
        "lbrace" => "{",
        "rbrace" => "}",
        "lbrack" => "[",
        "rbrack" => "]",
        "lfloor" => "⌊",
        "rfloor" => "⌋",
        "lceil" => "⌈",
        "rceil" => "⌉",
        _ => return None,
    })
}

// ── Parser ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
enum Terminator {
    Eof,
    Group,
    Fence,
    Cell,
    Bracket,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_open_brace(&mut self) -> PResult<()> {
        match self.next() {
            Some(Token::OpenBrace) => Ok(()),
            other => Err(ParseError(format!("expected '{{', got {other:?}"))),
        }
    }

    fn parse_top(&mut self) -> PResult<MathNode> {
        let nodes = self.parse_sequence(Terminator::Eof)?;
        Ok(row(nodes))
    }

    fn parse_sequence(&mut self, term: Terminator) -> PResult<Vec<MathNode>> {
        let mut nodes = Vec::new();
        loop {
            match self.peek() {
                None => {
                    if term == Terminator::Eof {
                        break;
                    }
                    return Err(ParseError("unexpected end of input".into()));
                }
                Some(Token::CloseBrace) => {
                    if term == Terminator::Group {
                        break;
                    }
                    return Err(ParseError("unbalanced '}'".into()));
                }
                Some(Token::Symbol(']')) if term == Terminator::Bracket => break,
                Some(Token::Ampersand) | Some(Token::NewRow) => {
                    if term == Terminator::Cell {
                        break;
                    }
                    return Err(ParseError("alignment marker outside environment".into()));
                }
                Some(Token::Command(c)) if c == "right" => {
                    if term == Terminator::Fence {
                        break;
                    }
                    return Err(ParseError("\\right without \\left".into()));
                }
                Some(Token::Command(c)) if c == "end" => {
                    if term == Terminator::Cell {
                        break;
                    }
                    return Err(ParseError("\\end without \\begin".into()));
                }
                Some(_) => nodes.push(self.parse_scripted()?),
            }
        }
        Ok(nodes)
    }

    /// Parse one atom plus any `^`/`_` scripts attached to it.
    fn parse_scripted(&mut self) -> PResult<MathNode> {
        let base = self.parse_atom()?;
        let mut sub = None;
        let mut sup = None;
        loop {
            match self.peek() {
                Some(Token::Sub) if sub.is_none() => {
                    self.next();
                    sub = Some(self.parse_argument()?);
                }
                Some(Token::Sup) if sup.is_none() => {
                    self.next();
                    sup = Some(self.parse_argument()?);
                }
                _ => break,
            }
        }
        Ok(match (sub, sup) {
            (None, None) => base,
            (Some(s), None) => MathNode::Sub(Box::new(base), Box::new(s)),
            (None, Some(s)) => MathNode::Sup(Box::new(base), Box::new(s)),
            (Some(sb), Some(sp)) => {
                MathNode::SubSup(Box::new(base), Box::new(sb), Box::new(sp))
            }
        })
    }

    /// Parse a single command argument: a braced group or one atom.
    fn parse_argument(&mut self) -> PResult<MathNode> {
        if self.peek() == Some(&Token::OpenBrace) {
            self.next();
            let nodes = self.parse_sequence(Terminator::Group)?;
            match self.next() {
                Some(Token::CloseBrace) => Ok(row(nodes)),
                _ => Err(ParseError("unclosed group".into())),
            }
        } else {
            self.parse_atom()
        }
    }

    fn parse_atom(&mut self) -> PResult<MathNode> {
        match self.next() {
            Some(Token::OpenBrace) => {
                let nodes = self.parse_sequence(Terminator::Group)?;
                match self.next() {
                    Some(Token::CloseBrace) => Ok(row(nodes)),
                    _ => Err(ParseError("unclosed group".into())),
                }
            }
            Some(Token::Letter(c)) => Ok(MathNode::Ident(c.to_string())),
            Some(Token::Number(n)) => Ok(MathNode::Num(n)),
            Some(Token::Symbol(c)) => Ok(MathNode::Op(c.to_string())),
            Some(Token::Command(name)) => self.parse_command(&name),
            other => Err(ParseError(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_command(&mut self, name: &str) -> PResult<MathNode> {
        match name {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.parse_argument()?;
                let den = self.parse_argument()?;
                Ok(MathNode::Frac(Box::new(num), Box::new(den)))
            }
            "sqrt" => {
                if self.peek() == Some(&Token::Symbol('[')) {
                    self.next();
                    let index = self.parse_sequence(Terminator::Bracket)?;
                    match self.next() {
                        Some(Token::Symbol(']')) => {}
                        _ => return Err(ParseError("unclosed root index".into())),
                    }
                    let base = self.parse_argument()?;
                    Ok(MathNode::Root(Box::new(base), Box::new(row(index))))
                } else {
                    let base = self.parse_argument()?;
                    Ok(MathNode::Sqrt(Box::new(base)))
                }
            }
            "begin" => {
                let env = self.parse_env_name()?;
                self.parse_environment(&env)
            }
            "left" => self.parse_fenced(),
            "text" | "mathrm" | "textrm" | "mbox" | "operatorname" => {
                let content = self.parse_argument_text()?;
                Ok(MathNode::Text(content))
            }
            "mathbf" | "mathit" | "boldsymbol" => {
                // Styling is dropped; the argument renders unstyled.
                self.parse_argument()
            }
            "mathbb" => {
                let content = self.parse_argument_text()?;
                match double_struck(content.trim()) {
                    Some(glyph) => Ok(MathNode::Ident(glyph.to_string())),
                    None => Ok(MathNode::Ident(content)),
                }
            }
            "quad" => Ok(MathNode::Space("1em")),
            "qquad" => Ok(MathNode::Space("2em")),
            "," => Ok(MathNode::Space("0.167em")),
            ";" => Ok(MathNode::Space("0.278em")),
            ":" => Ok(MathNode::Space("0.222em")),
            "!" | " " => Ok(MathNode::Space("0.167em")),
            _ => {
                if let Some(glyph) = ident_symbol(name) {
                    Ok(MathNode::Ident(glyph.to_string()))
                } else if let Some(glyph) = op_symbol(name) {
                    Ok(MathNode::Op(glyph.to_string()))
                } else if function_name(name) {
                    Ok(MathNode::Ident(name.to_string()))
                } else {
                    Err(ParseError(format!("unknown command '\\{name}'")))
                }
            }
        }
    }

    /// Read `{name}` after `\begin`/`\end`, allowing a trailing `*`.
    fn parse_env_name(&mut self) -> PResult<String> {
        self.expect_open_brace()?;
        let mut name = String::new();
        loop {
            match self.next() {
                Some(Token::CloseBrace) => break,
                Some(Token::Letter(c)) => name.push(c),
                Some(Token::Symbol('*')) => name.push('*'),
                other => return Err(ParseError(format!("bad environment name: {other:?}"))),
            }
        }
        Ok(name)
    }

    fn parse_environment(&mut self, env: &str) -> PResult<MathNode> {
        if !MULTILINE_ENVS.contains(&env) {
            return Err(ParseError(format!("unknown environment '{env}'")));
        }

        // array takes a column-spec argument we have no use for.
        if env == "array" && self.peek() == Some(&Token::OpenBrace) {
            self.skip_group()?;
        }

        let mut rows: Vec<Vec<MathNode>> = Vec::new();
        let mut cells: Vec<MathNode> = Vec::new();
        loop {
            let seq = self.parse_sequence(Terminator::Cell)?;
            match self.next() {
                Some(Token::Ampersand) => cells.push(row(seq)),
                Some(Token::NewRow) => {
                    cells.push(row(seq));
                    rows.push(std::mem::take(&mut cells));
                }
                Some(Token::Command(c)) if c == "end" => {
                    let closing = self.parse_env_name()?;
                    if closing != env {
                        return Err(ParseError(format!(
                            "\\begin{{{env}}} closed by \\end{{{closing}}}"
                        )));
                    }
                    cells.push(row(seq));
                    rows.push(cells);
                    break;
                }
                other => return Err(ParseError(format!("unexpected token in environment: {other:?}"))),
            }
        }

        // A trailing \\ before \end leaves an empty final row behind.
        if rows
            .last()
            .is_some_and(|r| r.iter().all(|c| matches!(c, MathNode::Row(v) if v.is_empty())))
        {
            rows.pop();
        }

        let table = MathNode::Table(rows);
        Ok(match env {
            "pmatrix" => fenced("(", ")", table),
            "bmatrix" => fenced("[", "]", table),
            "vmatrix" => fenced("|", "|", table),
            "Vmatrix" => fenced("‖", "‖", table),
            "cases" => fenced("{", "", table),
            "matrix" | "smallmatrix" | "array" => table,
            // Alignment environments with a single cell collapse to it.
            _ => match table {
                MathNode::Table(mut rows) if rows.len() == 1 && rows[0].len() == 1 => {
                    rows.pop().unwrap().pop().unwrap()
                }
                t => t,
            },
        })
    }

    /// Skip one balanced braced group (used for array column specs).
    fn skip_group(&mut self) -> PResult<()> {
        self.expect_open_brace()?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next() {
                Some(Token::OpenBrace) => depth += 1,
                Some(Token::CloseBrace) => depth -= 1,
                Some(_) => {}
                None => return Err(ParseError("unclosed group".into())),
            }
        }
        Ok(())
    }

    fn parse_fenced(&mut self) -> PResult<MathNode> {
        let open = self.parse_delimiter()?;
        let inner = self.parse_sequence(Terminator::Fence)?;
        match self.next() {
            Some(Token::Command(c)) if c == "right" => {}
            _ => return Err(ParseError("\\left without matching \\right".into())),
        }
        let close = self.parse_delimiter()?;
        Ok(fenced(&open, &close, row(inner)))
    }

    /// Read the delimiter token after `\left`/`\right`; `.` means none.
    fn parse_delimiter(&mut self) -> PResult<String> {
        match self.next() {
            Some(Token::Symbol('.')) => Ok(String::new()),
            Some(Token::Symbol(c)) => Ok(c.to_string()),
            Some(Token::Command(name)) => delimiter_symbol(&name)
                .map(str::to_string)
                .ok_or_else(|| ParseError(format!("bad delimiter '\\{name}'"))),
            other => Err(ParseError(format!("bad delimiter: {other:?}"))),
        }
    }

    /// Flatten a braced argument back into plain text (for `\text`-likes).
    fn parse_argument_text(&mut self) -> PResult<String> {
        if self.peek() != Some(&Token::OpenBrace) {
            // Single-token argument.
            return match self.next() {
                Some(Token::Letter(c)) => Ok(c.to_string()),
                Some(Token::Number(n)) => Ok(n),
                other => Err(ParseError(format!("expected text argument, got {other:?}"))),
            };
        }
        self.next();
        let mut out = String::new();
        let mut depth = 1usize;
        loop {
            match self.next() {
                Some(Token::OpenBrace) => depth += 1,
                Some(Token::CloseBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(Token::Letter(c)) => out.push(c),
                Some(Token::Number(n)) => out.push_str(&n),
                Some(Token::Symbol(c)) => out.push(c),
                Some(Token::Sup) => out.push('^'),
                Some(Token::Sub) => out.push('_'),
                Some(Token::Ampersand) => out.push('&'),
                Some(Token::NewRow) => out.push(' '),
                Some(Token::Command(name)) => {
                    out.push(' ');
                    out.push_str(&name);
                }
                None => return Err(ParseError("unclosed text argument".into())),
            }
        }
        Ok(out)
    }
}

fn fenced(open: &str, close: &str, inner: MathNode) -> MathNode {
    MathNode::Fenced(open.to_string(), close.to_string(), Box::new(inner))
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Parse an expression after macro expansion and line-break wrapping.
pub(crate) fn parse_expression(latex: &str) -> Result<MathNode, ParseError> {
    let prepared = wrap_bare_line_breaks(&expand_macros(latex));
    let tokens = lex(&prepared)?;
    Parser { tokens, pos: 0 }.parse_top()
}

/// Render a parsed tree as one `<math>` element (single line).
pub(crate) fn presentation_markup(tree: &MathNode) -> String {
    format!(
        "<math xmlns=\"{MATHML_NS}\" display=\"block\">{}</math>",
        arg_markup(tree)
    )
}

/// The `<mtext>` fallback for input the parser rejects.
pub(crate) fn fallback_markup(latex: &str) -> String {
    format!(
        "<math xmlns=\"{MATHML_NS}\" display=\"block\"><mtext>{}</mtext></math>",
        xml_escape(latex)
    )
}

/// Render LaTeX to Presentation MathML, falling back on parse failure.
pub fn render_presentation(latex: &str) -> String {
    match parse_expression(latex) {
        Ok(tree) => presentation_markup(&tree),
        Err(e) => {
            tracing::debug!("MathML fallback for {latex:?}: {}", e.0);
            fallback_markup(latex)
        }
    }
}

/// Serialize one node (single line, XML-escaped text content).
pub(crate) fn node_markup(node: &MathNode) -> String {
    match node {
        MathNode::Row(children) => {
            if children.len() == 1 {
                node_markup(&children[0])
            } else {
                let inner: String = children.iter().map(node_markup).collect();
                format!("<mrow>{inner}</mrow>")
            }
        }
        MathNode::Ident(s) => format!("<mi>{}</mi>", xml_escape(s)),
        MathNode::Num(s) => format!("<mn>{}</mn>", xml_escape(s)),
        MathNode::Op(s) => format!("<mo>{}</mo>", xml_escape(s)),
        MathNode::Text(s) => format!("<mtext>{}</mtext>", xml_escape(s)),
        MathNode::Space(w) => format!("<mspace width=\"{w}\"/>"),
        MathNode::Frac(num, den) => {
            format!("<mfrac>{}{}</mfrac>", arg_markup(num), arg_markup(den))
        }
        MathNode::Sqrt(base) => format!("<msqrt>{}</msqrt>", arg_markup(base)),
        MathNode::Root(base, index) => {
            format!("<mroot>{}{}</mroot>", arg_markup(base), arg_markup(index))
        }
        MathNode::Sub(base, sub) => {
            format!("<msub>{}{}</msub>", arg_markup(base), arg_markup(sub))
        }
        MathNode::Sup(base, sup) => {
            format!("<msup>{}{}</msup>", arg_markup(base), arg_markup(sup))
        }
        MathNode::SubSup(base, sub, sup) => format!(
            "<msubsup>{}{}{}</msubsup>",
            arg_markup(base),
            arg_markup(sub),
            arg_markup(sup)
        ),
        MathNode::Fenced(open, close, inner) => {
            let mut out = String::from("<mrow>");
            if !open.is_empty() {
                out.push_str(&format!("<mo>{}</mo>", xml_escape(open)));
            }
            out.push_str(&node_markup(inner));
            if !close.is_empty() {
                out.push_str(&format!("<mo>{}</mo>", xml_escape(close)));
            }
            out.push_str("</mrow>");
            out
        }
        MathNode::Table(rows) => {
            let mut out = String::from("<mtable>");
            for cells in rows {
                out.push_str("<mtr>");
                for cell in cells {
                    out.push_str(&format!("<mtd>{}</mtd>", node_markup(cell)));
                }
                out.push_str("</mtr>");
            }
            out.push_str("</mtable>");
            out
        }
    }
}

/// Serialize a node in a slot that requires exactly one element.
fn arg_markup(node: &MathNode) -> String {
    match node {
        MathNode::Row(_) => {
            let inner = node_markup(node);
            if inner.starts_with("<mrow>") {
                inner
            } else {
                format!("<mrow>{inner}</mrow>")
            }
        }
        other => node_markup(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(xml: &str) {
        assert!(xml.starts_with("<math "), "got: {xml}");
        assert!(xml.ends_with("</math>"), "got: {xml}");
        let opens = xml.matches('<').count();
        let closes = xml.matches('>').count();
        assert_eq!(opens, closes, "angle brackets unbalanced in {xml}");
    }

    #[test]
    fn simple_identifiers_and_numbers() {
        let xml = render_presentation("x + 2");
        balanced(&xml);
        assert!(xml.contains("<mi>x</mi>"));
        assert!(xml.contains("<mo>+</mo>"));
        assert!(xml.contains("<mn>2</mn>"));
    }

    #[test]
    fn fraction_structure() {
        let xml = render_presentation(r"\frac{a}{b}");
        balanced(&xml);
        assert!(xml.contains("<mfrac><mi>a</mi><mi>b</mi></mfrac>"), "got: {xml}");
    }

    #[test]
    fn nested_fraction() {
        let xml = render_presentation(r"\frac{\frac{a}{b}}{c}");
        balanced(&xml);
        assert!(xml.contains("<mfrac><mfrac><mi>a</mi><mi>b</mi></mfrac><mi>c</mi></mfrac>"));
    }

    #[test]
    fn roots() {
        let xml = render_presentation(r"\sqrt{x}");
        assert!(xml.contains("<msqrt><mi>x</mi></msqrt>"));

        let xml = render_presentation(r"\sqrt[3]{x}");
        assert!(xml.contains("<mroot><mi>x</mi><mn>3</mn></mroot>"));
    }

    #[test]
    fn scripts_combine_into_msubsup() {
        let xml = render_presentation("x_i^2");
        assert!(xml.contains("<msubsup><mi>x</mi><mi>i</mi><mn>2</mn></msubsup>"), "got: {xml}");

        let xml = render_presentation("x^{2}");
        assert!(xml.contains("<msup><mi>x</mi><mn>2</mn></msup>"));
    }

    #[test]
    fn greek_and_operators() {
        let xml = render_presentation(r"\alpha \leq \beta");
        assert!(xml.contains("<mi>α</mi>"));
        assert!(xml.contains("<mo>≤</mo>"));
    }

    #[test]
    fn blackboard_macro_expansion() {
        let xml = render_presentation(r"x \in \R");
        assert!(xml.contains("<mi>ℝ</mi>"), "got: {xml}");
        // \Rightarrow must not be mangled by the \R macro.
        let xml = render_presentation(r"a \Rightarrow b");
        assert!(xml.contains("<mo>⇒</mo>"), "got: {xml}");
    }

    #[test]
    fn bare_line_break_wraps_in_aligned() {
        let xml = render_presentation(r"x = 1 \\ y = 2");
        balanced(&xml);
        assert!(xml.contains("<mtable>"), "got: {xml}");
        assert_eq!(xml.matches("<mtr>").count(), 2);
    }

    #[test]
    fn explicit_environment_is_not_rewrapped() {
        let xml = render_presentation("\\begin{aligned} x &= 1 \\\\ y &= 2 \\end{aligned}");
        balanced(&xml);
        assert_eq!(xml.matches("<mtable>").count(), 1);
        assert_eq!(xml.matches("<mtr>").count(), 2);
        assert_eq!(xml.matches("<mtd>").count(), 4);
    }

    #[test]
    fn pmatrix_gets_parens() {
        let xml = render_presentation("\\begin{pmatrix} 1 & 0 \\\\ 0 & 1 \\end{pmatrix}");
        balanced(&xml);
        assert!(xml.contains("<mo>(</mo>"));
        assert!(xml.contains("<mo>)</mo>"));
        assert!(xml.contains("<mtable>"));
    }

    #[test]
    fn cases_gets_single_brace() {
        let xml = render_presentation("\\begin{cases} x & x > 0 \\\\ 0 & x \\leq 0 \\end{cases}");
        balanced(&xml);
        assert!(xml.contains("<mo>{</mo>"));
        assert!(!xml.contains("<mo>}</mo>"));
    }

    #[test]
    fn left_right_fencing() {
        let xml = render_presentation(r"\left( \frac{a}{b} \right)");
        balanced(&xml);
        assert!(xml.contains("<mo>(</mo>"));
        assert!(xml.contains("<mo>)</mo>"));
    }

    #[test]
    fn text_command() {
        let xml = render_presentation(r"\text{speed} = v");
        assert!(xml.contains("<mtext>speed</mtext>"));
    }

    #[test]
    fn unknown_command_falls_back_to_mtext() {
        let xml = render_presentation(r"\notacommand{x}");
        balanced(&xml);
        assert!(xml.contains("<mtext>"), "got: {xml}");
        assert!(xml.contains("notacommand"));
    }

    #[test]
    fn unbalanced_braces_fall_back() {
        let xml = render_presentation(r"\frac{a}{b");
        balanced(&xml);
        assert!(xml.contains("<mtext>"));
    }

    #[test]
    fn fallback_escapes_markup_characters() {
        let xml = render_presentation("a <mi>fake</mi> & b \\nosuch");
        assert!(xml.contains("&lt;mi&gt;"), "got: {xml}");
        assert!(xml.contains("&amp;"));
    }

    #[test]
    fn empty_input_is_still_one_math_element() {
        let xml = render_presentation("");
        balanced(&xml);
    }
}
