/// Member search and display

use crate::utils::{shorten_middle, MEMBER_ID_DISPLAY_EDGE, MEMBER_ID_DISPLAY_MAX};

/// A member as listed: the real id plus its display form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
    pub id: String,
    pub display: String,
}

/// Case-insensitive substring filter that keeps the original order.
/// An empty query returns every member.
pub fn filter<'a>(members: &'a [String], query: &str) -> Vec<&'a str> {
    if query.is_empty() {
        return members.iter().map(String::as_str).collect();
    }

    let needle = query.to_lowercase();
    members
        .iter()
        .filter(|m| m.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}

/// Ids longer than 16 characters are shown as `prefix...suffix`
pub fn display_member_id(member_id: &str) -> String {
    if member_id.chars().count() > MEMBER_ID_DISPLAY_MAX {
        shorten_middle(member_id, MEMBER_ID_DISPLAY_EDGE)
    } else {
        member_id.to_string()
    }
}

pub fn member_rows(members: &[String], query: &str) -> Vec<MemberRow> {
    filter(members, query)
        .into_iter()
        .map(|id| MemberRow {
            id: id.to_string(),
            display: display_member_id(id),
        })
        .collect()
}
