//! Pairwise arithmetic.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::ToolError;
use crate::tool::{ToolResult, TypedTool};

/// Calculator for one binary operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseArithmetic;

/// An operand as sent by the model, either a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    /// A JSON number.
    Number(f64),
    /// A string such as `"1"` or `" 2.5 "`.
    Text(String),
}

impl Operand {
    fn value(&self, which: &str) -> ToolResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                ToolError::invalid_args(format!("{which} is not a number: {s:?}"))
            }),
        }
    }
}

/// Arguments for [`PairwiseArithmetic`].
#[derive(Debug, Clone, Deserialize)]
pub struct ArithmeticArgs {
    /// Left-hand side.
    pub first_operand: Operand,
    /// Right-hand side.
    pub second_operand: Operand,
    /// One of `+ - * /`.
    pub operator: String,
}

#[async_trait]
impl TypedTool for PairwiseArithmetic {
    const NAME: &'static str = "do_pairwise_arithmetic";
    type Args = ArithmeticArgs;
    type Output = String;

    fn description(&self) -> String {
        "Calculator function for doing basic arithmetic. \
         Supports addition, subtraction, multiplication and division."
            .to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "first_operand": {"type": "string", "description": "First operand (before the operator)"},
                "second_operand": {"type": "string", "description": "Second operand (after the operator)"},
                "operator": {
                    "type": "string",
                    "description": "The operation to perform. Must be either +, -, *, or /",
                    "enum": ["+", "-", "*", "/"]
                }
            },
            "required": ["first_operand", "second_operand", "operator"]
        })
    }

    async fn call(&self, args: Self::Args) -> ToolResult<Self::Output> {
        info!(
            first_operand = ?args.first_operand,
            second_operand = ?args.second_operand,
            operator = %args.operator,
            "do_pairwise_arithmetic"
        );
        let lhs = args.first_operand.value("first_operand")?;
        let rhs = args.second_operand.value("second_operand")?;
        let result = match args.operator.trim() {
            "+" => lhs + rhs,
            "-" => lhs - rhs,
            "*" | "x" | "×" => lhs * rhs,
            "/" | "÷" => {
                if rhs == 0.0 {
                    return Err(ToolError::execution("division by zero"));
                }
                lhs / rhs
            }
            other => return Err(ToolError::execution(format!("unsupported operator: {other}"))),
        };
        Ok(format_number(result))
    }
}

/// Integral values print without a fraction.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}
