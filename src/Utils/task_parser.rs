/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" which has titles and
/// pairs key-vector of values. Lines starting with //, #, % or ; are comments.
///
/// ```text
/// potential
/// V0: 1.0
/// C: 1.0
/// shooting
/// bracket: 0.0, 3.0
/// ```
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type DocumentMap = HashMap<String, SectionMap>;
pub type SectionMap = HashMap<String, Option<Vec<Value>>>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_string(&self) -> Option<&String> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// floats, and integers widened to f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

/// Parses a title (word characters without spaces)
fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = identifier(input)?;
    Ok((input.trim(), result))
}

/// Parses a key (word characters without spaces)
fn parse_key(input: &str) -> IResult<&str, String> {
    identifier(input)
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    // a single value ends at a comma, whitespace or semicolon
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\r' | '\n' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        let s = s.trim();
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let separator_coma = delimited(space0, tag(","), space0);
    let mut value_parser = separated_list0(separator_coma, parse_value);
    value_parser.parse(input)
}

/// Parses a key-value pair where value is a list
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let mut parser = separated_pair(parse_key, colon_separator, parse_value_list);
    let (input, result) = parser.parse(input)?;
    Ok((input.trim(), result))
}

/// Parses a section with a title and multiple key-value pairs
fn parse_section(input: &str) -> IResult<&str, (String, Vec<(String, Vec<Value>)>)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let mut parser = many1(terminated(parse_key_value_pair, space0));
    let (input, pairs) = parser.parse(input)?;
    Ok((input, (title, pairs)))
}

/// Filters out comment lines (starting with //, #, %, or ;)
pub fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses the entire document into a HashMap. Repeated sections are merged, a repeated key keeps
/// the last value.
pub fn parse_document(input: &str) -> IResult<&str, DocumentMap> {
    let mut parser = many1(delimited(space0, parse_section, multispace0));
    let (input, sections) = parser.parse(input)?;

    let mut result: DocumentMap = HashMap::new();
    for (title, pairs) in sections.into_iter() {
        let title_map = result.entry(title).or_default();
        for (key, values) in pairs {
            title_map.insert(key, Some(values));
        }
    }
    Ok((input, result))
}

/// Strips comments and parses the whole document; unparsed leftovers are an error.
pub fn parse_document_as(input: &str) -> Result<DocumentMap, String> {
    let filtered = filter_comments(input);
    if filtered.trim().is_empty() {
        return Ok(HashMap::new());
    }
    match parse_document(&filtered) {
        Ok((remaining, parsed)) => {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Failed to parse entire document. Remaining: '{}'",
                    remaining
                ));
            }
            Ok(parsed)
        }
        Err(e) => Err(format!("Parsing error: {:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("potential\n V0: 1.0").unwrap();
        assert_eq!(title, "potential");
        assert_eq!(remaining, "V0: 1.0");

        let (remaining, title) = parse_title("fixed_energy energy: 0.01").unwrap();
        assert_eq!(title, "fixed_energy");
        assert_eq!(remaining, "energy: 0.01");
    }

    #[test]
    fn test_parse_key() {
        let (remaining, key) = parse_key("max_iterations: 1000").unwrap();
        assert_eq!(key, "max_iterations");
        assert_eq!(remaining, ": 1000");
        assert!(parse_key("1abc: 2").is_err());
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("DOPRI5, next").unwrap();
        assert_eq!(value, Value::String("DOPRI5".to_string()));
        assert_eq!(remaining, ", next");

        let (_, value) = parse_value("3000").unwrap();
        assert_eq!(value, Value::Integer(3000));

        let (_, value) = parse_value("1e-6").unwrap();
        assert_eq!(value, Value::Float(1e-6));

        let (_, value) = parse_value("-0.5").unwrap();
        assert_eq!(value, Value::Float(-0.5));

        let (_, value) = parse_value("false").unwrap();
        assert_eq!(value, Value::Boolean(false));
    }

    #[test]
    fn test_parse_value_list() {
        let (remaining, values) = parse_value_list("0.0, 3.0\nnext").unwrap();
        assert_eq!(values, vec![Value::Float(0.0), Value::Float(3.0)]);
        assert_eq!(remaining, "\nnext");
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("domain : 0.001 , 4\nb: 1").unwrap();
        assert_eq!(key, "domain");
        assert_eq!(values, vec![Value::Float(0.001), Value::Integer(4)]);
        assert_eq!(remaining, "b: 1");
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(2).as_float(), Some(2.0));
        assert_eq!(Value::Float(2.5).as_integer(), None);
        assert_eq!(Value::Boolean(true).as_boolean(), Some(true));
        assert_eq!(
            Value::String("a".to_string()).as_string(),
            Some(&"a".to_string())
        );
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
    }

    #[test]
    fn test_filter_comments() {
        let doc = "// header\npotential\n# note\nV0: 2\n% other\n; last\n\nC: 3";
        assert_eq!(filter_comments(doc), "potential\nV0: 2\nC: 3");
    }

    #[test]
    fn test_parse_document() {
        let doc = "
        potential
        V0: 2.0
        C: 1.5
        // comment
        shooting
        bracket: 0.0, 3.0
        max_iterations: 200
        output
        dir: results
        ";
        let parsed = parse_document_as(doc).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(
            parsed["potential"]["V0"],
            Some(vec![Value::Float(2.0)])
        );
        assert_eq!(
            parsed["shooting"]["bracket"],
            Some(vec![Value::Float(0.0), Value::Float(3.0)])
        );
        assert_eq!(
            parsed["shooting"]["max_iterations"],
            Some(vec![Value::Integer(200)])
        );
        assert_eq!(
            parsed["output"]["dir"],
            Some(vec![Value::String("results".to_string())])
        );
    }

    #[test]
    fn test_repeated_section_is_merged() {
        let doc = "potential\nV0: 2\npotential\nC: 3\nV0: 4";
        let parsed = parse_document_as(doc).unwrap();
        assert_eq!(parsed["potential"]["V0"], Some(vec![Value::Integer(4)]));
        assert_eq!(parsed["potential"]["C"], Some(vec![Value::Integer(3)]));
    }

    #[test]
    fn test_empty_and_broken_documents() {
        assert!(parse_document_as("# only comments\n\n").unwrap().is_empty());
        assert!(parse_document_as("potential\nV0 2.0").is_err());
        assert!(parse_document_as(": 2.0").is_err());
    }
}
