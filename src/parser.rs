//! Literal and type-string parsing using nom.
//!
//! Collection literals are split into element slices here; each slice is handed
//! to the element codec's own `parse`. Splitting respects quoted strings and
//! nested brackets, so `{'a,b', {1,2}}` yields two elements.
//!
//! ```text
//! {'x', 'y'}          sequence / set
//! {1: 'a', 2: 'b'}    map, UDT
//! frozen<list<int>>   type string
//! ```

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::{all_consuming, opt, recognize},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};

use crate::error::{CqlError, CqlResult};
use crate::types::{UdtType, WireType};

/// Case-insensitive NULL sentinel.
pub const NULL_TOKEN: &str = "NULL";

pub fn is_null_literal(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(NULL_TOKEN)
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Strip the quotes from a string literal, undoubling embedded quotes.
pub fn unquote(input: &str) -> Option<String> {
    let input = input.trim();
    match all_consuming(quoted)(input) {
        Ok((_, raw)) => Some(raw[1..raw.len() - 1].replace("''", "'")),
        Err(_) => None,
    }
}

/// Split `{e1, e2, ...}` into trimmed element slices.
pub fn split_elements(input: &str, open: char, close: char) -> Result<Vec<&str>, String> {
    let trimmed = input.trim();
    let result = all_consuming(delimited(
        pair(char(open), multispace0),
        separated_list0(separator(','), term),
        pair(multispace0, char(close)),
    ))(trimmed);

    match result {
        Ok((_, elements)) => Ok(elements.into_iter().map(str::trim).collect()),
        Err(e) => Err(describe(e)),
    }
}

/// Split `{k1: v1, k2: v2}` into trimmed key/value slices.
pub fn split_entries(input: &str, open: char, close: char) -> Result<Vec<(&str, &str)>, String> {
    let trimmed = input.trim();
    let result = all_consuming(delimited(
        pair(char(open), multispace0),
        separated_list0(separator(','), separated_pair(term, separator(':'), term)),
        pair(multispace0, char(close)),
    ))(trimmed);

    match result {
        Ok((_, entries)) => Ok(entries
            .into_iter()
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect()),
        Err(e) => Err(describe(e)),
    }
}

fn describe(e: nom::Err<nom::error::Error<&str>>) -> String {
    match e {
        nom::Err::Error(inner) | nom::Err::Failure(inner) => {
            if inner.input.is_empty() {
                "unexpected end of input (unbalanced brackets?)".to_string()
            } else {
                format!("malformed literal near '{}'", inner.input)
            }
        }
        nom::Err::Incomplete(_) => "incomplete literal".to_string(),
    }
}

fn separator(sep: char) -> impl FnMut(&str) -> IResult<&str, char> {
    move |input| delimited(multispace0, char(sep), multispace0)(input)
}

/// One element: any mix of quoted strings, bracketed groups and bare text.
fn term(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((quoted, group, bare))))(input)
}

fn bare(input: &str) -> IResult<&str, &str> {
    is_not(",:{}[]()'")(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('\''),
        many0(alt((tag("''"), is_not("'")))),
        char('\''),
    ))(input)
}

fn group(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(delimited(char('{'), group_body, char('}'))),
        recognize(delimited(char('['), group_body, char(']'))),
        recognize(delimited(char('('), group_body, char(')'))),
    ))(input)
}

fn group_body(input: &str) -> IResult<&str, Vec<&str>> {
    many0(alt((quoted, group, is_not("{}[]()'"))))(input)
}

// ==================== Type strings ====================

struct TypeExpr<'a> {
    name: &'a str,
    params: Vec<TypeExpr<'a>>,
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, many0(alt((alphanumeric1, tag("_"))))))(input)
}

fn qualified_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(identifier, opt(preceded(char('.'), identifier))))(input)
}

fn type_expr(input: &str) -> IResult<&str, TypeExpr<'_>> {
    let (input, name) = preceded(multispace0, qualified_identifier)(input)?;
    let (input, params) = opt(delimited(
        preceded(multispace0, char('<')),
        separated_list1(preceded(multispace0, char(',')), type_expr),
        preceded(multispace0, char('>')),
    ))(input)?;

    Ok((
        input,
        TypeExpr {
            name,
            params: params.unwrap_or_default(),
        },
    ))
}

/// Parse a CQL type string such as `frozen<map<text, list<int>>>`.
pub fn parse_wire_type(
    input: &str,
    resolve_udt: &dyn Fn(&str) -> Option<UdtType>,
) -> CqlResult<WireType> {
    let (_, expr) = all_consuming(terminated(type_expr, multispace0))(input.trim())
        .map_err(|e| CqlError::illegal_argument("type", input, describe(e)))?;
    resolve(&expr, input, resolve_udt)
}

fn resolve(
    expr: &TypeExpr<'_>,
    input: &str,
    resolve_udt: &dyn Fn(&str) -> Option<UdtType>,
) -> CqlResult<WireType> {
    let arity = |n: usize| -> CqlResult<()> {
        if expr.params.len() == n {
            Ok(())
        } else {
            Err(CqlError::illegal_argument(
                "type",
                input,
                format!("{} takes {} type parameter(s)", expr.name, n),
            ))
        }
    };
    let param = |i: usize| resolve(&expr.params[i], input, resolve_udt);

    let lower = expr.name.to_ascii_lowercase();
    let ty = match lower.as_str() {
        "list" => {
            arity(1)?;
            WireType::list(param(0)?)
        }
        "set" => {
            arity(1)?;
            WireType::set(param(0)?)
        }
        "map" => {
            arity(2)?;
            WireType::map(param(0)?, param(1)?)
        }
        "frozen" => {
            arity(1)?;
            param(0)?.frozen()
        }
        scalar => {
            arity(0)?;
            match scalar {
                "ascii" => WireType::Ascii,
                "bigint" => WireType::Bigint,
                "blob" => WireType::Blob,
                "boolean" => WireType::Boolean,
                "counter" => WireType::Counter,
                "date" => WireType::Date,
                "decimal" => WireType::Decimal,
                "double" => WireType::Double,
                "float" => WireType::Float,
                "inet" => WireType::Inet,
                "int" => WireType::Int,
                "smallint" => WireType::Smallint,
                "text" | "varchar" => WireType::Text,
                "time" => WireType::Time,
                "timestamp" => WireType::Timestamp,
                "timeuuid" => WireType::Timeuuid,
                "tinyint" => WireType::Tinyint,
                "uuid" => WireType::Uuid,
                "varint" => WireType::Varint,
                _ => match resolve_udt(expr.name) {
                    Some(udt) => WireType::Udt(udt),
                    None => {
                        return Err(CqlError::illegal_argument(
                            "type",
                            input,
                            format!("unknown type '{}'", expr.name),
                        ));
                    }
                },
            }
        }
    };
    Ok(ty)
}
