//! Facts/edges text format parser and writer for the probound engine.
//!
//! A problem is described by two whitespace-separated text files:
//!
//! - `facts.txt`: one `name probability` pair per line, declaring the known
//!   facts and their marginal probabilities.
//! - `edges.txt`: one `source body probability` triple per line, where the
//!   body is a `;`-separated conjunction of fact identifiers. A probability
//!   of `-1` marks an evidence-only rule: it declares that the facts are
//!   correlated without supplying the conditional probability.
//!
//! Blank lines are skipped in both files. Probabilities are parsed exactly
//! (decimal strings into rationals), never through floating point.
//!
//! The result side of the format lives here too: `results.txt` carries one
//! `fact\t[min,max]` line per output fact and `exprs.txt` one
//! `fact\t<expression>` line.

use std::io;

use probound_model::{format_decimal, parse_decimal, DecimalParseError};
use probound_model::{BigRational, Problem, Rule, RuleProb};

use anyhow::Error;
use num_traits::One;
use thiserror::Error;

/// Possible errors while parsing the facts/edges text format.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(
        "line {}: expected 'fact probability', found {} tokens",
        line,
        found
    )]
    FactTokenCount { line: usize, found: usize },
    #[error(
        "line {}: expected 'source body probability', found {} tokens",
        line,
        found
    )]
    EdgeTokenCount { line: usize, found: usize },
    #[error("line {}: {}", line, source)]
    InvalidProbability {
        line: usize,
        source: DecimalParseError,
    },
    #[error("line {}: empty conjunct in rule body", line)]
    EmptyBody { line: usize },
}

/// The rule probability value marking an evidence-only rule.
fn unknown_sentinel() -> BigRational {
    -BigRational::one()
}

/// Parses a `facts.txt` stream into (fact, marginal) pairs in file order.
pub fn parse_facts(input: impl io::Read) -> Result<Vec<(String, BigRational)>, Error> {
    use io::BufRead;

    let mut facts = Vec::new();
    for (index, line) in io::BufReader::new(input).lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != 2 {
            return Err(ParserError::FactTokenCount {
                line: line_number,
                found: tokens.len(),
            }
            .into());
        }
        let marginal =
            parse_decimal(tokens[1]).map_err(|source| ParserError::InvalidProbability {
                line: line_number,
                source,
            })?;
        facts.push((tokens[0].to_owned(), marginal));
    }
    Ok(facts)
}

/// Parses an `edges.txt` stream into rules in file order.
pub fn parse_edges(input: impl io::Read) -> Result<Vec<Rule>, Error> {
    use io::BufRead;

    let mut rules = Vec::new();
    for (index, line) in io::BufReader::new(input).lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != 3 {
            return Err(ParserError::EdgeTokenCount {
                line: line_number,
                found: tokens.len(),
            }
            .into());
        }

        let body: Vec<String> = tokens[1].split(';').map(str::to_owned).collect();
        if body.iter().any(String::is_empty) {
            return Err(ParserError::EmptyBody { line: line_number }.into());
        }

        let value =
            parse_decimal(tokens[2]).map_err(|source| ParserError::InvalidProbability {
                line: line_number,
                source,
            })?;
        let prob = if value == unknown_sentinel() {
            RuleProb::Unknown
        } else {
            RuleProb::Prob(value)
        };

        rules.push(Rule {
            source: tokens[0].to_owned(),
            body,
            prob,
        });
    }
    Ok(rules)
}

/// Reads a complete problem from a facts stream and an edges stream.
pub fn read_problem(facts: impl io::Read, edges: impl io::Read) -> Result<Problem, Error> {
    let mut problem = Problem::new();
    for (name, marginal) in parse_facts(facts)? {
        problem.add_fact(name, marginal);
    }
    for rule in parse_edges(edges)? {
        problem.add_rule(rule);
    }
    Ok(problem)
}

/// Writes the known facts of a problem in `facts.txt` format.
pub fn write_facts(mut target: impl io::Write, problem: &Problem) -> io::Result<()> {
    for (name, marginal) in problem.facts() {
        writeln!(target, "{} {}", name, format_decimal(marginal))?;
    }
    Ok(())
}

/// Writes the rules of a problem in `edges.txt` format.
pub fn write_edges(mut target: impl io::Write, problem: &Problem) -> io::Result<()> {
    for rule in problem.rules() {
        let prob = match &rule.prob {
            RuleProb::Prob(value) => format_decimal(value),
            RuleProb::Unknown => format_decimal(&unknown_sentinel()),
        };
        writeln!(target, "{} {} {}", rule.source, rule.body.join(";"), prob)?;
    }
    Ok(())
}

/// Writes per-fact probability bounds in `results.txt` format.
///
/// Each line is `fact\t[min,max]`; a bound for which the oracle found no
/// optimum is written as `-1`.
pub fn write_results<'a>(
    mut target: impl io::Write,
    results: impl IntoIterator<Item = (&'a str, Option<f64>, Option<f64>)>,
) -> io::Result<()> {
    for (fact, min, max) in results {
        writeln!(
            target,
            "{}\t[{},{}]",
            fact,
            render_bound(min),
            render_bound(max)
        )?;
    }
    Ok(())
}

fn render_bound(bound: Option<f64>) -> String {
    match bound {
        Some(value) => value.to_string(),
        None => "-1".to_owned(),
    }
}

/// Writes rendered output expressions in `exprs.txt` format.
pub fn write_exprs<'a>(
    mut target: impl io::Write,
    exprs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> io::Result<()> {
    for (fact, expr) in exprs {
        writeln!(target, "{}\t{}", fact, expr)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(s: &str) -> BigRational {
        parse_decimal(s).unwrap()
    }

    #[test]
    fn parses_facts_in_order() {
        let input = "a 0.5\n\nb 0.25\n";
        let facts = parse_facts(input.as_bytes()).unwrap();
        assert_eq!(
            facts,
            vec![
                ("a".to_owned(), decimal("0.5")),
                ("b".to_owned(), decimal("0.25")),
            ]
        );
    }

    #[test]
    fn rejects_wrong_fact_token_count() {
        let err = parse_facts("a 0.5 extra\n".as_bytes()).unwrap_err();
        let err = err.downcast::<ParserError>().unwrap();
        assert!(matches!(err, ParserError::FactTokenCount { line: 1, found: 3 }));
    }

    #[test]
    fn parses_edges_and_unknown_sentinel() {
        let input = "f a;b 0.9\ng a -1\no c 0.8\n";
        let rules = parse_edges(input.as_bytes()).unwrap();

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].source, "f");
        assert_eq!(rules[0].body, ["a", "b"]);
        assert_eq!(rules[0].prob, RuleProb::Prob(decimal("0.9")));
        assert_eq!(rules[1].prob, RuleProb::Unknown);
        assert_eq!(rules[2].body, ["c"]);
    }

    #[test]
    fn rejects_wrong_edge_token_count() {
        let err = parse_edges("f a\n".as_bytes()).unwrap_err();
        let err = err.downcast::<ParserError>().unwrap();
        assert!(matches!(err, ParserError::EdgeTokenCount { line: 1, found: 2 }));
    }

    #[test]
    fn rejects_empty_body_conjunct() {
        let err = parse_edges("f a;;b 0.9\n".as_bytes()).unwrap_err();
        let err = err.downcast::<ParserError>().unwrap();
        assert!(matches!(err, ParserError::EmptyBody { line: 1 }));
    }

    #[test]
    fn rejects_bad_probability() {
        let err = parse_facts("a zero\n".as_bytes()).unwrap_err();
        let err = err.downcast::<ParserError>().unwrap();
        assert!(matches!(err, ParserError::InvalidProbability { line: 1, .. }));
    }

    #[test]
    fn writes_bracketed_results() {
        let mut out = Vec::new();
        write_results(
            &mut out,
            vec![("o", Some(0.58), Some(0.58)), ("p", None, Some(0.3))],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "o\t[0.58,0.58]\np\t[-1,0.3]\n"
        );
    }

    #[test]
    fn writes_expression_lines() {
        let mut out = Vec::new();
        write_exprs(&mut out, vec![("o", "1*V0_1"), ("p", "3/10*V1_1")]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "o\t1*V0_1\np\t3/10*V1_1\n"
        );
    }

    #[test]
    fn problem_round_trips_through_files() {
        use std::fs::File;

        let tmp = tempfile::TempDir::new().unwrap();
        let facts_path = tmp.path().join("facts.txt");
        let edges_path = tmp.path().join("edges.txt");

        let mut problem = Problem::new();
        problem.add_fact("a", decimal("0.5"));
        problem.add_fact("b", decimal("0.3"));
        problem.add_rule(Rule::new("b", ["a"], decimal("0.9")));
        problem.add_rule(Rule::evidence("c", ["a", "b"]));

        write_facts(File::create(&facts_path).unwrap(), &problem).unwrap();
        write_edges(File::create(&edges_path).unwrap(), &problem).unwrap();

        let read = read_problem(
            File::open(&facts_path).unwrap(),
            File::open(&edges_path).unwrap(),
        )
        .unwrap();
        assert_eq!(
            read.facts().collect::<Vec<_>>(),
            problem.facts().collect::<Vec<_>>()
        );
        assert_eq!(
            read.rules().collect::<Vec<_>>(),
            problem.rules().collect::<Vec<_>>()
        );
    }

    #[test]
    fn write_parse_round_trip() {
        let facts_in = "a 0.5\nb 0.3\n";
        let edges_in = "b a 0.9\nc a -1\no a;b 0.8\n";
        let problem = read_problem(facts_in.as_bytes(), edges_in.as_bytes()).unwrap();

        let mut facts_out = Vec::new();
        let mut edges_out = Vec::new();
        write_facts(&mut facts_out, &problem).unwrap();
        write_edges(&mut edges_out, &problem).unwrap();

        assert_eq!(String::from_utf8(facts_out).unwrap(), facts_in);
        assert_eq!(String::from_utf8(edges_out).unwrap(), edges_in);
    }
}
