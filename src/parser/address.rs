//! Address list parser built on the header lexer.

use crate::decode::charset::TextConverter;
use crate::model::address::{Address, AddressList, Group, Mailbox};
use crate::parser::header::decode_encoded_words;
use crate::parser::lexer::{tokenize, Token, TokenKind, ADDRESS_SPECIALS};

/// Parse a comma-separated list of mailboxes and groups.
///
/// Supported entry forms:
/// - `user@domain.com`
/// - `<user@domain.com>`
/// - `Display Name <user@domain.com>` (name may be quoted or encoded)
/// - `user@domain.com (Display Name)`
/// - `group: a@b, c@d;`
///
/// Entries that fit none of these are kept as [`Mailbox::malformed`].
pub fn parse_address_list(value: &str, converter: &dyn TextConverter) -> AddressList {
    let tokens = tokenize(value, ADDRESS_SPECIALS);
    let mut list = AddressList::default();
    let mut group: Option<Group> = None;
    let mut seg_start = 0;
    let mut in_angle = false;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Special(b'<') => in_angle = true,
            TokenKind::Special(b'>') => in_angle = false,
            TokenKind::Special(b':') if !in_angle && group.is_none() => {
                let name = phrase(&tokens[seg_start..i], converter).unwrap_or_default();
                group = Some(Group {
                    name,
                    members: Vec::new(),
                });
                seg_start = i + 1;
            }
            TokenKind::Special(b',') if !in_angle => {
                let entry = parse_mailbox(value, &tokens[seg_start..i], converter);
                push_entry(&mut list, group.as_mut(), entry);
                seg_start = i + 1;
            }
            TokenKind::Special(b';') if !in_angle && group.is_some() => {
                let entry = parse_mailbox(value, &tokens[seg_start..i], converter);
                push_entry(&mut list, group.as_mut(), entry);
                list.entries.extend(group.take().map(Address::Group));
                seg_start = i + 1;
            }
            _ => {}
        }
    }

    let entry = parse_mailbox(value, &tokens[seg_start..], converter);
    push_entry(&mut list, group.as_mut(), entry);
    // Unterminated group still keeps its members.
    list.entries.extend(group.take().map(Address::Group));
    list
}

fn push_entry(list: &mut AddressList, group: Option<&mut Group>, entry: Option<Mailbox>) {
    let Some(mailbox) = entry else { return };
    match group {
        Some(g) => g.members.push(mailbox),
        None => list.entries.push(Address::Mailbox(mailbox)),
    }
}

fn is_blank(token: &Token<'_>) -> bool {
    matches!(token.kind, TokenKind::Whitespace | TokenKind::Comment)
}

/// Parse one entry; `None` when the entry holds nothing but whitespace.
fn parse_mailbox(
    source: &str,
    tokens: &[Token<'_>],
    converter: &dyn TextConverter,
) -> Option<Mailbox> {
    let first = tokens.iter().position(|t| !is_blank(t))?;
    let last = tokens.iter().rposition(|t| !is_blank(t))?;
    let raw = &source[tokens[first].span.start..tokens[last].span.end];

    let malformed = || Mailbox::malformed(decode_encoded_words(raw.trim(), converter));

    if let Some(open) = tokens.iter().position(|t| t.is_special(b'<')) {
        let Some(close) = tokens[open..].iter().position(|t| t.is_special(b'>')) else {
            return Some(malformed());
        };
        let address = addr_spec(&tokens[open + 1..open + close]);
        if !address.contains('@') {
            return Some(malformed());
        }
        let name = phrase(&tokens[..open], converter);
        return Some(Mailbox::new(name, address));
    }

    let address = addr_spec(tokens);
    if !is_plausible_addr_spec(&address) {
        return Some(malformed());
    }
    // Old style `addr (Name)`.
    let name = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Comment)
        .map(|t| decode_encoded_words(t.value().trim(), converter))
        .find(|n| !n.is_empty());
    Some(Mailbox::new(name, address))
}

fn is_plausible_addr_spec(address: &str) -> bool {
    match address.rsplit_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

/// Concatenate the significant tokens of an address, dropping folding
/// whitespace and comments.
fn addr_spec(tokens: &[Token<'_>]) -> String {
    tokens
        .iter()
        .filter(|t| !is_blank(t))
        .map(|t| t.text)
        .collect()
}

/// Display-name text: quoted strings unquoted, encoded words decoded,
/// whitespace collapsed.
fn phrase(tokens: &[Token<'_>], converter: &dyn TextConverter) -> Option<String> {
    let mut text = String::new();
    for token in tokens {
        match token.kind {
            TokenKind::Whitespace => text.push(' '),
            TokenKind::Comment => {}
            TokenKind::Quoted => text.push_str(&token.value()),
            _ => text.push_str(token.text),
        }
    }
    let decoded = decode_encoded_words(&text, converter);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::charset::EncodingRsConverter;

    fn parse(value: &str) -> AddressList {
        parse_address_list(value, &EncodingRsConverter)
    }

    fn single(value: &str) -> Mailbox {
        parse(value).first().cloned().unwrap()
    }

    #[test]
    fn test_parse_bare_address() {
        let m = single("user@example.com");
        assert_eq!(m.address, "user@example.com");
        assert_eq!(m.name, None);
    }

    #[test]
    fn test_parse_angle_address() {
        let m = single("<user@example.com>");
        assert_eq!(m.address, "user@example.com");
        assert_eq!(m.name, None);
    }

    #[test]
    fn test_parse_name_and_address() {
        let m = single("User One <user1@example.com>");
        assert_eq!(m.address, "user1@example.com");
        assert_eq!(m.name.as_deref(), Some("User One"));
    }

    #[test]
    fn test_parse_quoted_name_with_comma() {
        let list = parse("\"Last, First\" <a@b.com>, other@c.com");
        let all: Vec<&Mailbox> = list.mailboxes().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name.as_deref(), Some("Last, First"));
        assert_eq!(all[1].address, "other@c.com");
    }

    #[test]
    fn test_encoded_display_name_b_and_q() {
        let b = single("=?UTF-8?B?Sm9zw6kgUMOpcmV6?= <jose@example.com>");
        let q = single("=?UTF-8?Q?Jos=C3=A9_P=C3=A9rez?= <jose@example.com>");
        assert_eq!(b.name.as_deref(), Some("José Pérez"));
        assert_eq!(b, q);
    }

    #[test]
    fn test_comment_name() {
        let m = single("jdoe@example.com (John Doe)");
        assert_eq!(m.address, "jdoe@example.com");
        assert_eq!(m.name.as_deref(), Some("John Doe"));
    }

    #[test]
    fn test_group() {
        let list = parse("Team: a@x.org, \"B\" <b@x.org>;, c@y.org");
        let group = list.groups().next().unwrap();
        assert_eq!(group.name, "Team");
        assert_eq!(group.members.len(), 2);
        assert_eq!(list.mailboxes().count(), 3);
    }

    #[test]
    fn test_empty_group() {
        let list = parse("undisclosed-recipients:;");
        assert_eq!(list.groups().next().unwrap().name, "undisclosed-recipients");
        assert_eq!(list.mailboxes().count(), 0);
    }

    #[test]
    fn test_malformed_entries_are_kept() {
        let list = parse("not an address, Bob <bob@x.org");
        let all: Vec<&Mailbox> = list.mailboxes().collect();
        assert_eq!(all.len(), 2);
        assert!(all[0].is_malformed());
        assert_eq!(all[0].name.as_deref(), Some("not an address"));
        assert!(all[1].is_malformed());
        assert_eq!(all[1].name.as_deref(), Some("Bob <bob@x.org"));
    }

    #[test]
    fn test_folded_list() {
        let list = parse("a@x.org,\r\n\tB <b@x.org>");
        assert_eq!(list.mailboxes().count(), 2);
    }

    #[test]
    fn test_empty_value() {
        assert!(parse("  ").is_empty());
    }
}
