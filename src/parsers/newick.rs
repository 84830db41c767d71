use super::{MalformedKind, ParseError};
use crate::{NodeId, Tree, TreeFloat};
use tracing::debug;

/// Bytes of context kept on each side of an error position.
const FRAGMENT_RADIUS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Comma,
    Colon,
    Semicolon,
    Text(&'a str),
}

/// Checks if a character is a NEWICK structural delimiter.
fn is_structural_delimiter(character: char) -> bool {
    matches!(character, ';' | '(' | ')' | ',' | ':')
}

/// Splits a NEWICK string on its delimiters. Whitespace around tokens is
/// dropped; whitespace inside a label is kept.
struct Tokenizer<'a> {
    s: &'a str,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, position: 0 }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = (usize, Token<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.s[self.position..];
        let trimmed = rest.trim_start();
        self.position += rest.len() - trimmed.len();

        let start = self.position;
        let character = trimmed.chars().next()?;
        let token = match character {
            '(' => Token::Open,
            ')' => Token::Close,
            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            _ => {
                let end = trimmed
                    .find(is_structural_delimiter)
                    .unwrap_or(trimmed.len());
                self.position += end;
                return Some((start, Token::Text(trimmed[..end].trim_end())));
            }
        };
        self.position += character.len_utf8();
        Some((start, token))
    }
}

fn malformed(kind: MalformedKind, s: &str, position: usize) -> ParseError {
    let mut start = position.saturating_sub(FRAGMENT_RADIUS);
    while !s.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (position + FRAGMENT_RADIUS).min(s.len());
    while !s.is_char_boundary(end) {
        end += 1;
    }
    ParseError::Malformed { kind, position, fragment: s[start..end].to_string() }
}

fn parse_branch_length(
    text: &str,
    s: &str,
    position: usize,
) -> Result<TreeFloat, ParseError> {
    match text.parse::<TreeFloat>() {
        Ok(length) if length.is_finite() && length >= 0.0 => Ok(length),
        _ => Err(malformed(MalformedKind::InvalidLength, s, position)),
    }
}

/// Parses a single NEWICK tree terminated by `;`.
///
/// `(` descends into a new first child, `,` starts a sibling under the
/// innermost open node and `)` closes it again. A label following `(`, `,`,
/// `)` or the start of the string names the current node; a value
/// following `:` is its branch length. Labels of internal nodes are also
/// taken as their support values.
pub fn parse_newick(s: &str) -> Result<Tree, ParseError> {
    let mut tree = Tree::new();
    let root_id = tree.add_new_node(<Option<&str>>::None, None, None)?;

    let mut open: Vec<NodeId> = Vec::new();
    let mut current: NodeId = root_id;
    let mut previous: Option<Token> = None;
    let mut has_content = false;
    let mut terminated = false;

    for (position, token) in Tokenizer::new(s) {
        if terminated {
            return Err(malformed(MalformedKind::TrailingInput, s, position));
        }
        if previous == Some(Token::Colon) && !matches!(token, Token::Text(_)) {
            return Err(malformed(MalformedKind::UnexpectedToken, s, position));
        }

        match token {
            Token::Open => {
                if !matches!(previous, None | Some(Token::Open | Token::Comma)) {
                    return Err(malformed(MalformedKind::UnexpectedToken, s, position));
                }
                open.push(current);
                current = tree.add_new_node(<Option<&str>>::None, None, Some(current))?;
                has_content = true;
            }
            Token::Comma => {
                let Some(&parent_id) = open.last() else {
                    return Err(malformed(
                        MalformedKind::UnbalancedParentheses,
                        s,
                        position,
                    ));
                };
                current = tree.add_new_node(<Option<&str>>::None, None, Some(parent_id))?;
            }
            Token::Close => {
                let Some(parent_id) = open.pop() else {
                    return Err(malformed(
                        MalformedKind::UnbalancedParentheses,
                        s,
                        position,
                    ));
                };
                current = parent_id;
            }
            Token::Colon => (),
            Token::Semicolon => {
                if !open.is_empty() {
                    return Err(malformed(
                        MalformedKind::UnbalancedParentheses,
                        s,
                        position,
                    ));
                }
                if !has_content {
                    return Err(malformed(MalformedKind::Empty, s, position));
                }
                terminated = true;
            }
            Token::Text(text) => {
                let Some(node) = tree.node_mut(Some(current)) else {
                    return Err(malformed(MalformedKind::UnexpectedToken, s, position));
                };
                match previous {
                    Some(Token::Colon) => {
                        if node.branch_length().is_some() {
                            return Err(malformed(
                                MalformedKind::UnexpectedToken,
                                s,
                                position,
                            ));
                        }
                        let length = parse_branch_length(text, s, position)?;
                        node.set_branch_length(Some(length));
                    }
                    None | Some(Token::Open | Token::Comma | Token::Close) => {
                        node.set_name(Some(text));
                    }
                    Some(Token::Text(_) | Token::Semicolon) => {
                        return Err(malformed(
                            MalformedKind::UnexpectedToken,
                            s,
                            position,
                        ));
                    }
                }
                has_content = true;
            }
        }
        previous = Some(token);
    }

    if !terminated {
        let kind = if !open.is_empty() {
            MalformedKind::UnbalancedParentheses
        } else if !has_content {
            MalformedKind::Empty
        } else {
            MalformedKind::MissingTerminator
        };
        return Err(malformed(kind, s, s.len()));
    }

    tree.init_support_from_labels();
    _ = tree.validate()?;

    debug!(
        tips = tree.tip_count_all(),
        internal = tree.internal_node_count_all(),
        "parsed newick tree"
    );
    Ok(tree)
}

/// Converts a [Tree] to a NEWICK formatted string. Tips are written with
/// their names and internal nodes with their current support values.
pub fn write_newick(tree: &Tree) -> String {
    if let Some(first_node_id) = tree.first_node_id() {
        let mut newick = String::new();
        write_newick_recursive(tree, first_node_id, &mut newick);
        newick.push(';');
        newick
    } else {
        String::new()
    }
}

fn write_newick_recursive(tree: &Tree, node_id: NodeId, newick: &mut String) {
    let child_ids = tree.child_ids(&node_id);
    if child_ids.is_empty() {
        if let Some(name) = tree.name(&node_id) {
            newick.push_str(&name);
        }
    } else {
        newick.push('(');
        for (idx, &child_id) in child_ids.iter().enumerate() {
            if idx > 0 {
                newick.push(',');
            }
            write_newick_recursive(tree, child_id, newick);
        }
        newick.push(')');
        if let Some(support) = tree.support(&node_id) {
            newick.push_str(&support);
        }
    }

    if let Some(node) = tree.node(Some(node_id))
        && node.parent_id().is_some()
        && let Some(branch_length) = node.branch_length()
    {
        newick.push_str(&format!(":{branch_length}"));
    }
}
