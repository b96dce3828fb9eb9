//! Address list values (RFC 5322 §3.4).

use std::fmt;

use serde::Serialize;

/// One mailbox: an optional display name and an address.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `name = Some("Juan García")`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `name = None`, `address = "user@example.com"`
/// - `"undisclosed"` (no `@`) → `name = Some("undisclosed")`, `address = ""`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    /// Human-readable display name, already decoded.
    pub name: Option<String>,
    /// The bare address (`local@domain`), empty for malformed entries.
    pub address: String,
}

impl Mailbox {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.filter(|n| !n.is_empty()),
            address: address.into(),
        }
    }

    /// An entry that could not be parsed, kept with its raw text as name.
    pub fn malformed(raw: impl Into<String>) -> Self {
        Self {
            name: Some(raw.into()),
            address: String::new(),
        }
    }

    /// `true` for entries kept from unparseable text.
    pub fn is_malformed(&self) -> bool {
        self.address.is_empty()
    }

    /// Display name, or an empty string.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.address.is_empty()) {
            (Some(name), false) if needs_quotes(name) => {
                write!(f, "\"{}\" <{}>", name.replace('\\', "\\\\").replace('"', "\\\""), self.address)
            }
            (Some(name), false) => write!(f, "{name} <{}>", self.address),
            (Some(name), true) => write!(f, "{name}"),
            (None, _) => write!(f, "{}", self.address),
        }
    }
}

fn needs_quotes(name: &str) -> bool {
    name.contains(|c: char| "()<>[]:;@\\,.\"".contains(c))
}

/// A named group: `name: member, member;`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub members: Vec<Mailbox>,
}

/// One entry of an address list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Address {
    Mailbox(Mailbox),
    Group(Group),
}

/// Parsed value of an address header, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressList {
    pub entries: Vec<Address>,
}

impl AddressList {
    /// All mailboxes with groups expanded to their members.
    pub fn mailboxes(&self) -> impl Iterator<Item = &Mailbox> {
        self.entries.iter().flat_map(|entry| match entry {
            Address::Mailbox(m) => std::slice::from_ref(m).iter(),
            Address::Group(g) => g.members.iter(),
        })
    }

    /// First mailbox after flattening.
    pub fn first(&self) -> Option<&Mailbox> {
        self.mailboxes().next()
    }

    /// Named groups only.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.entries.iter().filter_map(|entry| match entry {
            Address::Group(g) => Some(g),
            Address::Mailbox(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match entry {
                Address::Mailbox(m) => write!(f, "{m}")?,
                Address::Group(g) => {
                    write!(f, "{}:", g.name)?;
                    for (j, m) in g.members.iter().enumerate() {
                        write!(f, "{}{m}", if j == 0 { " " } else { ", " })?;
                    }
                    write!(f, ";")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_name() {
        let m = Mailbox::new(Some("Alice".into()), "alice@example.com");
        assert_eq!(m.to_string(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_display_quotes_specials() {
        let m = Mailbox::new(Some("Last, First".into()), "a@b.com");
        assert_eq!(m.to_string(), "\"Last, First\" <a@b.com>");
    }

    #[test]
    fn test_display_without_name() {
        let m = Mailbox::new(None, "alice@example.com");
        assert_eq!(m.to_string(), "alice@example.com");
        assert_eq!(Mailbox::new(Some(String::new()), "x@y").name, None);
    }

    #[test]
    fn test_group_flattening() {
        let list = AddressList {
            entries: vec![
                Address::Mailbox(Mailbox::new(None, "a@x")),
                Address::Group(Group {
                    name: "Team".into(),
                    members: vec![Mailbox::new(None, "b@x"), Mailbox::new(None, "c@x")],
                }),
            ],
        };
        let addrs: Vec<&str> = list.mailboxes().map(|m| m.address.as_str()).collect();
        assert_eq!(addrs, vec!["a@x", "b@x", "c@x"]);
        assert_eq!(list.groups().count(), 1);
        assert_eq!(list.to_string(), "a@x, Team: b@x, c@x;");
    }
}
