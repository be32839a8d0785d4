//! Parser for the joined impression line format.
//!
//! Each line is `|`-separated:
//!
//! ```text
//! labeled:   clicks|impressions|depth|position|query|keyword|title|description|user
//! unlabeled:                    depth|position|query|keyword|title|description|user
//! ```
//!
//! The four token fields hold `,`-separated token ids, and `user` is
//! `userid,gender,age`. Labeled lines become aggregated-mode events.

use hashlr_core::{Event, EventContext, Label, TaggedTokens, TokenFields};

use crate::error::{DataError, Result};

const FIELDS: [&str; 7] = [
    "depth",
    "position",
    "query",
    "keyword",
    "title",
    "description",
    "user",
];

/// Maps the raw gender code to the model's `{-1, 0, +1}` indicator.
///
/// `1` (male) becomes `-1`, `2` (female) becomes `+1`; any other code,
/// including `0` for unknown, becomes `0`.
pub fn map_gender(code: i32) -> i32 {
    match code {
        1 => -1,
        2 => 1,
        _ => 0,
    }
}

/// Parser for one dataset file's lines.
///
/// # Examples
///
/// ```
/// use hashlr_core::Label;
/// use hashlr_data::LineParser;
///
/// let parser = LineParser::labeled();
/// let event = parser.parse("1|3|2|1|12,7|5|9,9|4|490234,2,3", 1).unwrap();
/// assert_eq!(event.label, Label::Counts { clicks: 1, impressions: 3 });
/// assert_eq!(event.context.user_id, 490234);
/// assert_eq!(event.context.gender, 1);
/// assert_eq!(event.tokens.token_count(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineParser {
    labeled: bool,
}

impl LineParser {
    /// Creates a parser; `labeled` lines start with `clicks|impressions`.
    pub fn new(labeled: bool) -> Self {
        Self { labeled }
    }

    /// Parser for training lines.
    pub fn labeled() -> Self {
        Self::new(true)
    }

    /// Parser for held-out lines.
    pub fn unlabeled() -> Self {
        Self::new(false)
    }

    /// Returns `true` if lines carry a label.
    pub fn is_labeled(&self) -> bool {
        self.labeled
    }

    /// Parses one line. `line_no` is 1-based and only used in errors.
    ///
    /// # Errors
    ///
    /// - [`DataError::MissingField`] if the line has too few fields.
    /// - [`DataError::Parse`] on a non-integer scalar, a malformed user
    ///   field, or `clicks > impressions`.
    pub fn parse(&self, line: &str, line_no: u64) -> Result<Event> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.split('|');

        let label = if self.labeled {
            let clicks = parse_u32(next_field(&mut fields, "clicks", line_no)?, "clicks", line_no)?;
            let impressions = parse_u32(
                next_field(&mut fields, "impressions", line_no)?,
                "impressions",
                line_no,
            )?;
            if clicks > impressions {
                return Err(DataError::parse(
                    line_no,
                    format!("{clicks} clicks exceed {impressions} impressions"),
                ));
            }
            Label::Counts {
                clicks,
                impressions,
            }
        } else {
            Label::Unlabeled
        };

        let mut raw = [""; 7];
        for (slot, name) in raw.iter_mut().zip(FIELDS) {
            *slot = next_field(&mut fields, name, line_no)?;
        }
        let [depth, position, query, keyword, title, description, user] = raw;

        let depth = parse_i32(depth, "depth", line_no)?;
        let position = parse_i32(position, "position", line_no)?;

        let mut user_parts = user.split(',');
        let mut user_part = |name: &'static str| {
            user_parts
                .next()
                .ok_or_else(|| DataError::parse(line_no, format!("user field lacks {name}")))
        };
        let user_id = parse_u32(user_part("userid")?, "userid", line_no)?;
        let gender = parse_i32(user_part("gender")?, "gender", line_no)?;
        let age = parse_i32(user_part("age")?, "age", line_no)?;

        let context = EventContext::new(depth, position, age, map_gender(gender), user_id);
        let tokens = TaggedTokens {
            query: split_tokens(query),
            keyword: split_tokens(keyword),
            title: split_tokens(title),
            description: split_tokens(description),
        };

        Ok(Event::unlabeled(context, TokenFields::Tagged(tokens)).with_label(label))
    }
}

/// Formats an event back into the joined line format.
///
/// Binary-mode events are written with their single token sequence in the
/// query field. Gender is written as the mapped indicator.
pub fn format_line(event: &Event) -> String {
    let mut out = String::new();
    match event.label {
        Label::Counts {
            clicks,
            impressions,
        } => out.push_str(&format!("{clicks}|{impressions}|")),
        Label::Clicked(clicked) => out.push_str(&format!("{}|1|", u32::from(clicked))),
        Label::Unlabeled => {}
    }
    let ctx = &event.context;
    out.push_str(&format!("{}|{}|", ctx.depth, ctx.position));
    let empty: &[String] = &[];
    let fields: [&[String]; 4] = match &event.tokens {
        TokenFields::Single(tokens) => [tokens, empty, empty, empty],
        TokenFields::Tagged(t) => [&t.query, &t.keyword, &t.title, &t.description],
    };
    for tokens in fields {
        out.push_str(&tokens.join(","));
        out.push('|');
    }
    out.push_str(&format!("{},{},{}", ctx.user_id, ctx.gender, ctx.age));
    out
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
    line: u64,
) -> Result<&'a str> {
    fields.next().ok_or(DataError::MissingField { line, field })
}

fn parse_u32(raw: &str, what: &str, line: u64) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| DataError::parse(line, format!("{what} is not a non-negative integer: {raw:?}")))
}

fn parse_i32(raw: &str, what: &str, line: u64) -> Result<i32> {
    raw.trim()
        .parse()
        .map_err(|_| DataError::parse(line, format!("{what} is not an integer: {raw:?}")))
}

fn split_tokens(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labeled_line() {
        let event = LineParser::labeled()
            .parse("0|2|3|2|1,2,3|4|5,6|7,8,9|42,1,5", 9)
            .unwrap();
        assert_eq!(
            event.label,
            Label::Counts {
                clicks: 0,
                impressions: 2
            }
        );
        assert_eq!(event.context, EventContext::new(3, 2, 5, -1, 42));
        match &event.tokens {
            TokenFields::Tagged(t) => {
                assert_eq!(t.query, vec!["1", "2", "3"]);
                assert_eq!(t.keyword, vec!["4"]);
                assert_eq!(t.title, vec!["5", "6"]);
                assert_eq!(t.description, vec!["7", "8", "9"]);
            }
            TokenFields::Single(_) => panic!("expected tagged tokens"),
        }
    }

    #[test]
    fn test_parse_unlabeled_line() {
        let event = LineParser::unlabeled()
            .parse("1|1|10||3|4|0,0,0\r\n", 1)
            .unwrap();
        assert_eq!(event.label, Label::Unlabeled);
        assert_eq!(event.context.user_id, 0);
        assert_eq!(event.context.gender, 0);
        // The empty keyword field contributes no tokens.
        assert_eq!(event.tokens.token_count(), 3);
    }

    #[test]
    fn test_gender_mapping() {
        assert_eq!(map_gender(1), -1);
        assert_eq!(map_gender(2), 1);
        assert_eq!(map_gender(0), 0);
        assert_eq!(map_gender(7), 0);
    }

    #[test]
    fn test_missing_field() {
        let err = LineParser::labeled().parse("1|2|3|1|5|6", 4).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingField {
                line: 4,
                field: "title"
            }
        ));
    }

    #[test]
    fn test_bad_scalar() {
        let err = LineParser::unlabeled()
            .parse("x|1|2|3|4|5|1,1,1", 12)
            .unwrap_err();
        assert!(matches!(err, DataError::Parse { line: 12, .. }));
        assert_eq!(err.line(), Some(12));

        let err = LineParser::unlabeled()
            .parse("1|1|2|3|4|5|1,1", 3)
            .unwrap_err();
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn test_clicks_exceeding_impressions_rejected() {
        let err = LineParser::labeled()
            .parse("3|2|1|1|1|1|1|1|1,1,1", 2)
            .unwrap_err();
        assert!(matches!(err, DataError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_format_line() {
        let line = "2|5|3|1|1,2|4|5,6|7|42,1,3";
        let event = LineParser::labeled().parse(line, 1).unwrap();
        // Gender is written back as the mapped indicator.
        assert_eq!(format_line(&event), "2|5|3|1|1,2|4|5,6|7|42,-1,3");

        let unlabeled = event.with_label(Label::Unlabeled);
        assert_eq!(format_line(&unlabeled), "3|1|1,2|4|5,6|7|42,-1,3");
    }
}
