//! Payload interpreters.
//!
//! The master treats payloads as opaque; only this module gives them
//! meaning. Three task types are understood: `sort`, `matmul` and `math`.
//! Anything else, and any malformed payload, produces a failed outcome
//! rather than an error — the worker always has something to report back.

use serde_json::{json, Value};

use crate::scheduler::TaskOutcome;

/// Run one task payload and produce the outcome to report.
pub fn execute(task_type: &str, payload: &Value) -> (TaskOutcome, Value) {
    let result = match task_type {
        "sort" => do_sort(payload),
        "matmul" => do_matmul(payload),
        "math" => do_math(payload),
        other => Err(format!("unknown task type: {other}")),
    };

    match result {
        Ok(value) => (TaskOutcome::Done, value),
        Err(message) => (TaskOutcome::Failed, json!({ "error": message })),
    }
}

fn do_sort(payload: &Value) -> Result<Value, String> {
    let array = payload
        .get("array")
        .and_then(Value::as_array)
        .ok_or("payload.array must be an array")?;

    let mut items = array.clone();
    if items.iter().all(Value::is_number) {
        items.sort_by(|a, b| {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });
    } else {
        items.sort_by_key(|v| v.to_string());
    }
    Ok(json!({ "sorted": items }))
}

fn do_matmul(payload: &Value) -> Result<Value, String> {
    let a = matrix(payload.get("A"), "A")?;
    let b = matrix(payload.get("B"), "B")?;

    let n = a.len();
    let m = b.len();
    if m == 0 || a.iter().any(|row| row.len() != m) {
        return Err("inner dimensions of A and B do not match".to_string());
    }
    let p = b[0].len();
    if b.iter().any(|row| row.len() != p) {
        return Err("B has ragged rows".to_string());
    }

    let mut c = vec![vec![0.0; p]; n];
    for i in 0..n {
        for j in 0..p {
            let mut sum = 0.0;
            for k in 0..m {
                sum += a[i][k] * b[k][j];
            }
            c[i][j] = sum;
        }
    }
    Ok(json!({ "C": c }))
}

fn matrix(value: Option<&Value>, name: &str) -> Result<Vec<Vec<f64>>, String> {
    let rows = value
        .and_then(Value::as_array)
        .ok_or_else(|| format!("payload.{name} must be a matrix"))?;
    rows.iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| format!("payload.{name} must be a matrix"))?
                .iter()
                .map(|cell| {
                    cell.as_f64()
                        .ok_or_else(|| format!("payload.{name} contains a non-number"))
                })
                .collect()
        })
        .collect()
}

fn do_math(payload: &Value) -> Result<Value, String> {
    let expr = payload
        .get("expr")
        .and_then(Value::as_str)
        .ok_or("payload.expr must be a string")?;
    let value = eval_expr(expr)?;
    Ok(json!({ "value": value }))
}

/// Evaluate an arithmetic expression: `+ - * / ^` (and python-style `**`),
/// unary minus and parentheses. Replaces the reference implementation's
/// unrestricted `eval`.
fn eval_expr(input: &str) -> Result<f64, String> {
    let mut parser = ExprParser {
        chars: input.as_bytes(),
        pos: 0,
    };
    let value = parser.parse_sum()?;
    parser.skip_whitespace();
    if parser.pos != parser.chars.len() {
        return Err(format!("unexpected input at position {}", parser.pos));
    }
    Ok(value)
}

struct ExprParser<'a> {
    chars: &'a [u8],
    pos: usize,
}

impl ExprParser<'_> {
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_sum(&mut self) -> Result<f64, String> {
        let mut value = self.parse_product()?;
        loop {
            if self.eat(b'+') {
                value += self.parse_product()?;
            } else if self.eat(b'-') {
                value -= self.parse_product()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_product(&mut self) -> Result<f64, String> {
        let mut value = self.parse_power()?;
        loop {
            self.skip_whitespace();
            // '*' alone is multiplication; '**' is exponentiation and is
            // handled by parse_power, so do not consume it here.
            if self.peek() == Some(b'*') && self.chars.get(self.pos + 1) != Some(&b'*') {
                self.pos += 1;
                value *= self.parse_power()?;
            } else if self.eat(b'/') {
                let divisor = self.parse_power()?;
                if divisor == 0.0 {
                    return Err("division by zero".to_string());
                }
                value /= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_power(&mut self) -> Result<f64, String> {
        let base = self.parse_atom()?;
        self.skip_whitespace();
        let has_exponent = if self.peek() == Some(b'*') && self.chars.get(self.pos + 1) == Some(&b'*') {
            self.pos += 2;
            true
        } else {
            self.eat(b'^')
        };
        if has_exponent {
            // Right-associative
            let exponent = self.parse_power()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn parse_atom(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        if self.eat(b'-') {
            return Ok(-self.parse_atom()?);
        }
        if self.eat(b'(') {
            let value = self.parse_sum()?;
            if !self.eat(b')') {
                return Err("missing closing parenthesis".to_string());
            }
            return Ok(value);
        }

        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == b'.')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected a number at position {start}"));
        }
        std::str::from_utf8(&self.chars[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| format!("invalid number at position {start}"))
    }
}
