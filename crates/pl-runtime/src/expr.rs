use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use pl_core::{ParleyError, ScriptValue};
use regex::Regex;

/// Value sources an expression can reference.
pub(crate) trait Operands {
    fn variable(&self, name: &str) -> ScriptValue;
    fn reference(&self, parts: &[String]) -> Result<String, ParleyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Unset,
}

impl ExprValue {
    pub fn truthy(&self) -> bool {
        match self {
            Self::Int(value) => *value != 0,
            Self::Str(value) => !value.is_empty(),
            Self::Bool(value) => *value,
            Self::Unset => false,
        }
    }

    pub fn into_script_value(self) -> ScriptValue {
        match self {
            Self::Int(value) => ScriptValue::Int(value),
            Self::Str(value) => ScriptValue::Str(value),
            Self::Bool(value) => ScriptValue::Int(i64::from(value)),
            Self::Unset => ScriptValue::Unset,
        }
    }

    fn text(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Str(value) => value.clone(),
            Self::Bool(value) => value.to_string(),
            Self::Unset => String::new(),
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<ScriptValue> for ExprValue {
    fn from(value: ScriptValue) -> Self {
        match value {
            ScriptValue::Int(value) => Self::Int(value),
            ScriptValue::Str(value) => Self::Str(value),
            ScriptValue::Unset => Self::Unset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Int(i64),
    Str(String),
    Var(String),
    Word(String),
    Op(&'static str),
}

const OPERATORS: [&str; 17] = [
    "==", "!=", "<=", ">=", "&&", "||", "=", "<", ">", "+", "-", "*", "/", "(", ")", "!", ",",
];

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(
            r#"^\s*(?:(?P<int>[0-9]+)|"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|\$(?P<var>[A-Za-z_][A-Za-z0-9_]*)|(?P<word>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)|(?P<op>==|!=|<=|>=|&&|\|\||[-+*/()<>=!,]))"#,
        )
        .expect("token regex must compile")
    })
}

fn malformed(expr: &str, detail: impl fmt::Display) -> ParleyError {
    ParleyError::new(
        "EXPR_MALFORMED",
        format!("Malformed expression \"{}\": {}.", expr, detail),
    )
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ParleyError> {
    let regex = token_regex();
    let mut tokens = Vec::new();
    let mut rest = expr;
    while !rest.trim().is_empty() {
        let captures = regex
            .captures(rest)
            .ok_or_else(|| malformed(expr, format!("unexpected input at \"{}\"", rest.trim())))?;
        let token = if let Some(int) = captures.name("int") {
            let value = int
                .as_str()
                .parse::<i64>()
                .map_err(|error| malformed(expr, error))?;
            Token::Int(value)
        } else if let Some(text) = captures.name("dq").or_else(|| captures.name("sq")) {
            Token::Str(text.as_str().to_string())
        } else if let Some(var) = captures.name("var") {
            Token::Var(var.as_str().to_string())
        } else if let Some(word) = captures.name("word") {
            Token::Word(word.as_str().to_string())
        } else {
            let op = captures
                .name("op")
                .map(|op| op.as_str())
                .unwrap_or_default();
            let known = OPERATORS
                .iter()
                .find(|candidate| **candidate == op)
                .ok_or_else(|| malformed(expr, format!("unknown operator \"{}\"", op)))?;
            Token::Op(known)
        };
        tokens.push(token);
        let consumed = captures
            .get(0)
            .map(|whole| whole.end())
            .unwrap_or(rest.len());
        rest = &rest[consumed..];
    }
    Ok(tokens)
}

pub(crate) fn evaluate(expr: &str, operands: &dyn Operands) -> Result<ExprValue, ParleyError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(malformed(expr, "empty expression"));
    }
    let mut parser = Parser {
        expr,
        tokens,
        position: 0,
        operands,
    };
    let value = parser.or()?;
    if let Some(token) = parser.peek() {
        return Err(malformed(expr, format!("trailing token {:?}", token)));
    }
    Ok(value)
}

struct Parser<'a> {
    expr: &'a str,
    tokens: Vec<Token>,
    position: usize,
    operands: &'a dyn Operands,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn eat_op(&mut self, wanted: &[&str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if wanted.contains(op) => {
                let op = *op;
                self.position += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn or(&mut self) -> Result<ExprValue, ParleyError> {
        let mut left = self.and()?;
        while self.eat_op(&["||"]).is_some() {
            let right = self.and()?;
            left = ExprValue::Bool(left.truthy() || right.truthy());
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<ExprValue, ParleyError> {
        let mut left = self.comparison()?;
        while self.eat_op(&["&&"]).is_some() {
            let right = self.comparison()?;
            left = ExprValue::Bool(left.truthy() && right.truthy());
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<ExprValue, ParleyError> {
        let left = self.sum()?;
        let Some(op) = self.eat_op(&["==", "=", "!=", "<", "<=", ">", ">="]) else {
            return Ok(left);
        };
        let right = self.sum()?;
        if self.eat_op(&["==", "=", "!=", "<", "<=", ">", ">="]).is_some() {
            return Err(malformed(self.expr, "comparisons cannot be chained"));
        }
        Ok(ExprValue::Bool(compare(op, &left, &right)))
    }

    fn sum(&mut self) -> Result<ExprValue, ParleyError> {
        let mut left = self.product()?;
        while let Some(op) = self.eat_op(&["+", "-"]) {
            let right = self.product()?;
            left = self.arithmetic(op, &left, &right)?;
        }
        Ok(left)
    }

    fn product(&mut self) -> Result<ExprValue, ParleyError> {
        let mut left = self.unary()?;
        while let Some(op) = self.eat_op(&["*", "/"]) {
            let right = self.unary()?;
            left = self.arithmetic(op, &left, &right)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<ExprValue, ParleyError> {
        if let Some(op) = self.eat_op(&["-", "+", "!"]) {
            let value = self.unary()?;
            return match op {
                "!" => Ok(ExprValue::Bool(!value.truthy())),
                "-" => self.arithmetic("-", &ExprValue::Int(0), &value),
                _ => self.arithmetic("+", &ExprValue::Int(0), &value),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<ExprValue, ParleyError> {
        let Some(token) = self.tokens.get(self.position).cloned() else {
            return Err(malformed(self.expr, "unexpected end"));
        };
        self.position += 1;
        match token {
            Token::Int(value) => Ok(ExprValue::Int(value)),
            Token::Str(value) => Ok(ExprValue::Str(value)),
            Token::Var(name) => Ok(self.operands.variable(&name).into()),
            Token::Word(word) if word.contains('.') => {
                let parts = word.split('.').map(str::to_string).collect::<Vec<_>>();
                let text = self.operands.reference(&parts)?;
                Ok(ScriptValue::from_text(&text).into())
            }
            Token::Word(word) => match word.as_str() {
                "true" => Ok(ExprValue::Bool(true)),
                "false" => Ok(ExprValue::Bool(false)),
                _ => Ok(ExprValue::Str(word)),
            },
            Token::Op("(") => {
                let value = self.or()?;
                if self.eat_op(&[")"]).is_none() {
                    return Err(malformed(self.expr, "missing \")\""));
                }
                Ok(value)
            }
            Token::Op(op) => Err(malformed(self.expr, format!("unexpected \"{}\"", op))),
        }
    }

    fn arithmetic(
        &self,
        op: &str,
        left: &ExprValue,
        right: &ExprValue,
    ) -> Result<ExprValue, ParleyError> {
        let (ExprValue::Int(left), ExprValue::Int(right)) = (left, right) else {
            return Err(ParleyError::new(
                "EXPR_TYPE",
                format!(
                    "Operator \"{}\" needs integers in \"{}\" (got {:?} and {:?}).",
                    op, self.expr, left, right
                ),
            ));
        };
        let result = match op {
            "+" => left.checked_add(*right),
            "-" => left.checked_sub(*right),
            "*" => left.checked_mul(*right),
            _ => {
                if *right == 0 {
                    return Err(ParleyError::new(
                        "EXPR_DIVIDE_BY_ZERO",
                        format!("Division by zero in \"{}\".", self.expr),
                    ));
                }
                left.checked_div(*right)
            }
        };
        result.map(ExprValue::Int).ok_or_else(|| {
            ParleyError::new(
                "EXPR_OVERFLOW",
                format!("Integer overflow in \"{}\".", self.expr),
            )
        })
    }
}

fn compare(op: &str, left: &ExprValue, right: &ExprValue) -> bool {
    let ordering = match (left, right) {
        (ExprValue::Unset, ExprValue::Unset) => Some(Ordering::Equal),
        (ExprValue::Unset, _) | (_, ExprValue::Unset) => None,
        (ExprValue::Int(left), ExprValue::Int(right)) => Some(left.cmp(right)),
        (ExprValue::Bool(left), ExprValue::Bool(right)) => Some(left.cmp(right)),
        _ => Some(left.text().cmp(&right.text())),
    };
    match (op, ordering) {
        ("!=", None) => true,
        (_, None) => false,
        ("==" | "=", Some(ordering)) => ordering == Ordering::Equal,
        ("!=", Some(ordering)) => ordering != Ordering::Equal,
        ("<", Some(ordering)) => ordering == Ordering::Less,
        ("<=", Some(ordering)) => ordering != Ordering::Greater,
        (">", Some(ordering)) => ordering == Ordering::Greater,
        (_, Some(ordering)) => ordering != Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Fixture {
        variables: BTreeMap<String, ScriptValue>,
    }

    impl Operands for Fixture {
        fn variable(&self, name: &str) -> ScriptValue {
            self.variables.get(name).cloned().unwrap_or_default()
        }

        fn reference(&self, parts: &[String]) -> Result<String, ParleyError> {
            match parts {
                [qualifier, field] if qualifier == "party" && field == "gold" => {
                    Ok("250".to_string())
                }
                _ => Err(ParleyError::new(
                    "SCRIPT_PROVIDER_MISSING",
                    format!("No provider for \"{}\".", parts.join(".")),
                )),
            }
        }
    }

    fn eval(expr: &str) -> Result<ExprValue, ParleyError> {
        let mut variables = BTreeMap::new();
        variables.insert("gold".to_string(), ScriptValue::Int(40));
        variables.insert("name".to_string(), ScriptValue::from("Geoffrey"));
        variables.insert("count".to_string(), ScriptValue::from("12"));
        evaluate(expr, &Fixture { variables })
    }

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(eval("1 + 2 * 3").expect("eval"), ExprValue::Int(7));
        assert_eq!(eval("(1 + 2) * 3").expect("eval"), ExprValue::Int(9));
        assert_eq!(eval("20 / 3 - 1").expect("eval"), ExprValue::Int(5));
        assert_eq!(eval("-$gold + 50").expect("eval"), ExprValue::Int(10));
        assert_eq!(eval("+2").expect("eval"), ExprValue::Int(2));
    }

    #[test]
    fn comparisons_are_numeric_for_integers_and_textual_otherwise() {
        assert_eq!(eval("$gold >= 40").expect("eval"), ExprValue::Bool(true));
        assert_eq!(eval("$gold < 9").expect("eval"), ExprValue::Bool(false));
        assert_eq!(
            eval("$name == Geoffrey").expect("eval"),
            ExprValue::Bool(true)
        );
        assert_eq!(
            eval("$name = 'Geoffrey'").expect("eval"),
            ExprValue::Bool(true)
        );
        assert_eq!(eval("$count == 12").expect("eval"), ExprValue::Bool(true));
        assert_eq!(eval("abc < abd").expect("eval"), ExprValue::Bool(true));
    }

    #[test]
    fn unset_only_equals_unset() {
        assert_eq!(
            eval("$missing == $other").expect("eval"),
            ExprValue::Bool(true)
        );
        assert_eq!(eval("$missing == 0").expect("eval"), ExprValue::Bool(false));
        assert_eq!(
            eval("$missing == ''").expect("eval"),
            ExprValue::Bool(false)
        );
        assert_eq!(eval("$missing != 0").expect("eval"), ExprValue::Bool(true));
        assert_eq!(eval("$missing < 5").expect("eval"), ExprValue::Bool(false));
    }

    #[test]
    fn logical_operators_combine_comparisons() {
        assert_eq!(
            eval("$gold > 10 && $name == Geoffrey").expect("eval"),
            ExprValue::Bool(true)
        );
        assert_eq!(
            eval("$gold > 100 || !($gold > 100)").expect("eval"),
            ExprValue::Bool(true)
        );
        assert_eq!(eval("true && false").expect("eval"), ExprValue::Bool(false));
    }

    #[test]
    fn dotted_words_route_to_references() {
        assert_eq!(
            eval("party.gold - $gold").expect("eval"),
            ExprValue::Int(210)
        );
        let error = eval("vendor.price").expect_err("unknown qualifier should fail");
        assert_eq!(error.code, "SCRIPT_PROVIDER_MISSING");
    }

    #[test]
    fn malformed_expressions_are_errors() {
        for expr in ["", "1 +", "(1 + 2", "1 2", "1 < 2 < 3", "1 # 2", "*"] {
            let error = eval(expr).expect_err("malformed expression should fail");
            assert_eq!(error.code, "EXPR_MALFORMED", "expr {:?}", expr);
        }
    }

    #[test]
    fn arithmetic_type_and_range_errors() {
        assert_eq!(
            eval("1 / 0").expect_err("div by zero").code,
            "EXPR_DIVIDE_BY_ZERO"
        );
        assert_eq!(
            eval("$name + 1").expect_err("string math").code,
            "EXPR_TYPE"
        );
        assert_eq!(
            eval("$missing * 2").expect_err("unset math").code,
            "EXPR_TYPE"
        );
        assert_eq!(
            eval("9223372036854775807 + 1").expect_err("overflow").code,
            "EXPR_OVERFLOW"
        );
    }

    #[test]
    fn booleans_store_as_integers() {
        assert_eq!(
            ExprValue::Bool(true).into_script_value(),
            ScriptValue::Int(1)
        );
        assert_eq!(ExprValue::Unset.into_script_value(), ScriptValue::Unset);
        assert!(!ExprValue::Str(String::new()).truthy());
        assert!(ExprValue::Int(-1).truthy());
    }
}
