//! Address extraction for the SMTP envelope (RFC 5322 §3.4).
//!
//! Only the bare `local@domain` part matters for MAIL FROM / RCPT TO, so
//! display names, comments and group labels are discarded here.

/// Extract every addr-spec from an address-list header value.
///
/// Handles:
/// - `"user@domain.com"` and `"<user@domain.com>"`
/// - `"Display Name <user@domain.com>"`, including quoted commas
/// - comments: `"user@domain.com (Someone)"`
/// - groups: `"Team: a@x.com, b@x.com;"` and `"undisclosed-recipients:;"`
///
/// Entries without an `@` are skipped.
pub fn addr_specs(raw: &str) -> Vec<String> {
    split_mailboxes(raw)
        .iter()
        .filter_map(|mailbox| addr_spec(mailbox))
        .collect()
}

/// Extract the addr-spec of a single mailbox.
pub fn addr_spec(mailbox: &str) -> Option<String> {
    let cleaned = strip_comments(mailbox);
    let trimmed = cleaned.trim();

    let candidate = match (trimmed.rfind('<'), trimmed.rfind('>')) {
        (Some(start), Some(end)) if end > start => trimmed[start + 1..end].trim(),
        _ => trimmed,
    };

    if candidate.contains('@') && !candidate.contains(char::is_whitespace) {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// Split on top-level commas, treating group labels and terminators as separators.
fn split_mailboxes(raw: &str) -> Vec<String> {
    let mut results = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut comment_depth = 0usize;
    let mut escaped = false;

    for ch in raw.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes || comment_depth > 0 => {
                escaped = true;
                current.push(ch);
            }
            '"' if comment_depth == 0 => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' if !in_quotes => {
                comment_depth += 1;
                current.push(ch);
            }
            ')' if !in_quotes && comment_depth > 0 => {
                comment_depth -= 1;
                current.push(ch);
            }
            '<' if !in_quotes && comment_depth == 0 => {
                in_angle = true;
                current.push(ch);
            }
            '>' if !in_quotes && comment_depth == 0 => {
                in_angle = false;
                current.push(ch);
            }
            // "Group:" label; everything before it is the group name.
            ':' if !in_quotes && !in_angle && comment_depth == 0 => current.clear(),
            ',' | ';' if !in_quotes && !in_angle && comment_depth == 0 => {
                if !current.trim().is_empty() {
                    results.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        results.push(current);
    }

    results
}

/// Drop `( … )` comments outside quoted strings.
fn strip_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    let mut in_quotes = false;

    for ch in s.chars() {
        match ch {
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                out.push(ch);
            }
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes && depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            _ => out.push(ch),
        }
    }

    out
}
