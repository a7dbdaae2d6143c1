//! Scalar expression rendering

use era_ir::{
    AggFunc, AttributeSet, BinaryOp, Direction, Expr, Func, Literal, Side, SortKey,
    TemplatePart, TyKind, TypeEnv, UnaryOp, WindowFunc,
};

use crate::dialect::SqlDialect;
use crate::error::{SqlError, SqlResult};

/// How attribute references are spelled
#[derive(Debug, Clone, Copy)]
pub(crate) enum References<'a> {
    /// Quoted attribute name, valid against a single from-item
    Plain,
    /// Qualified by the alias of the join input the attribute comes from
    Join {
        left_alias: &'a str,
        right_alias: &'a str,
        left: &'a AttributeSet,
    },
}

/// Renders expressions of one relation node
#[derive(Clone, Copy)]
pub(crate) struct ExprWriter<'a> {
    pub dialect: &'a dyn SqlDialect,
    pub env: TypeEnv<'a>,
    pub refs: References<'a>,
    pub fold: bool,
}

impl<'a> ExprWriter<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, env: TypeEnv<'a>, refs: References<'a>) -> Self {
        Self {
            dialect,
            env,
            refs,
            fold: true,
        }
    }

    fn kind_of(&self, expr: &Expr) -> SqlResult<TyKind> {
        Ok(self.env.infer(expr)?.kind)
    }

    fn unsupported(&self, feature: impl Into<String>) -> SqlError {
        SqlError::Unsupported {
            dialect: self.dialect.name(),
            feature: feature.into(),
        }
    }

    pub fn attr(&self, name: &str, side: Option<Side>) -> String {
        let quoted = self.dialect.quote_ident(name);
        match self.refs {
            References::Plain => quoted,
            References::Join {
                left_alias,
                right_alias,
                left,
            } => {
                let alias = match side {
                    Some(Side::Left) => left_alias,
                    Some(Side::Right) => right_alias,
                    None if left.contains(name) => left_alias,
                    None => right_alias,
                };
                format!("{}.{}", self.dialect.quote_ident(alias), quoted)
            }
        }
    }

    /// Evaluate constant subtrees locally. Anything the evaluator rejects
    /// is left for the database.
    fn folded(&self, expr: &Expr) -> Option<String> {
        if !self.fold || matches!(expr, Expr::Literal { .. }) || !expr.is_constant() {
            return None;
        }
        let value = expr.evaluate().ok()?;
        if matches!(value, Literal::Float(x) if !x.is_finite()) {
            return None;
        }
        let kind = self.kind_of(expr).ok()?;
        literal(self.dialect, &value, kind).ok()
    }

    pub fn render(&self, expr: &Expr) -> SqlResult<String> {
        if let Some(sql) = self.folded(expr) {
            return Ok(sql);
        }
        match expr {
            Expr::Literal { value, ty } => literal(self.dialect, value, ty.kind),
            Expr::Attr { name, side } => Ok(self.attr(name, *side)),
            Expr::Unary { op, operand } => {
                let x = self.render(operand)?;
                Ok(match op {
                    UnaryOp::Not => format!("(not {x})"),
                    UnaryOp::Neg => format!("(- {x})"),
                    UnaryOp::IsNull => format!("({x} is null)"),
                    UnaryOp::IsNotNull => format!("({x} is not null)"),
                })
            }
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Function { func, args } => self.function(*func, args),
            Expr::In { operand, list } => Ok(format!(
                "({} in ({}))",
                self.render(operand)?,
                self.list(list)?
            )),
            Expr::Case {
                branches,
                otherwise,
            } => {
                let mut sql = String::from("(case");
                for branch in branches {
                    sql.push_str(&format!(
                        " when {} then {}",
                        self.render(&branch.when)?,
                        self.render(&branch.then)?
                    ));
                }
                if let Some(e) = otherwise {
                    sql.push_str(&format!(" else {}", self.render(e)?));
                }
                sql.push_str(" end)");
                Ok(sql)
            }
            Expr::Cast { operand, kind } => Ok(format!(
                "cast({} as {})",
                self.render(operand)?,
                self.dialect.type_name(*kind)
            )),
            Expr::Aggregate {
                func,
                operand,
                distinct,
            } => self.aggregate_call(*func, operand.as_deref(), *distinct),
            Expr::Window {
                func,
                operand,
                partition_by,
                order_by,
            } => self.window(*func, operand.as_deref(), partition_by, order_by),
            Expr::Template { parts } => self.template(parts),
            Expr::Impure { inner } => ExprWriter {
                fold: false,
                ..*self
            }
            .render(inner),
        }
    }

    fn list(&self, exprs: &[Expr]) -> SqlResult<String> {
        Ok(exprs
            .iter()
            .map(|e| self.render(e))
            .collect::<SqlResult<Vec<_>>>()?
            .join(", "))
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> SqlResult<String> {
        let l = self.render(left)?;
        let r = self.render(right)?;
        Ok(match op {
            BinaryOp::Mod => self.dialect.modulo(&l, &r),
            // integer division truncates in SQL
            BinaryOp::Div if self.kind_of(left)? == TyKind::Int => format!(
                "(cast({l} as {}) / {r})",
                self.dialect.type_name(TyKind::Float)
            ),
            _ => format!("({l} {op} {r})"),
        })
    }

    fn function(&self, func: Func, args: &[Expr]) -> SqlResult<String> {
        let first = || {
            args.first()
                .map(|a| self.render(a))
                .unwrap_or_else(|| Ok(String::new()))
        };
        Ok(match func {
            Func::Floor | Func::Ceil
                if args.first().map(|a| self.kind_of(a)).transpose()? == Some(TyKind::Int) =>
            {
                first()?
            }
            Func::Log2 => {
                let x = first()?;
                format!("(ln({x}) / ln(2))")
            }
            Func::Log10 => self.dialect.log10(&first()?),
            Func::Random => self.dialect.random().to_string(),
            _ => format!("{}({})", func.name(), self.list(args)?),
        })
    }

    fn aggregate_call(
        &self,
        func: AggFunc,
        operand: Option<&Expr>,
        distinct: bool,
    ) -> SqlResult<String> {
        let Some(operand) = operand else {
            return Ok(format!("{}(*)", func.name()));
        };
        let x = self.render(operand)?;
        if func == AggFunc::Median {
            if distinct {
                return Err(self.unsupported("median(distinct …)"));
            }
            return Ok(self.dialect.median(&x, self.kind_of(operand)?));
        }
        let distinct = if distinct { "distinct " } else { "" };
        Ok(format!("{}({distinct}{x})", func.name()))
    }

    fn window(
        &self,
        func: WindowFunc,
        operand: Option<&Expr>,
        partition_by: &[Expr],
        order_by: &[SortKey],
    ) -> SqlResult<String> {
        let call = match func {
            WindowFunc::RowNumber => "row_number()".to_string(),
            WindowFunc::Rank => "rank()".to_string(),
            WindowFunc::DenseRank => "dense_rank()".to_string(),
            WindowFunc::Lead { offset } | WindowFunc::Lag { offset } => {
                let name = if matches!(func, WindowFunc::Lead { .. }) {
                    "lead"
                } else {
                    "lag"
                };
                let x = operand.map(|e| self.render(e)).transpose()?.unwrap_or_default();
                format!("{name}({x}, {offset})")
            }
            WindowFunc::Aggregate(AggFunc::Median) if !self.dialect.supports_windowed_median() => {
                return Err(self.unsupported("median as a window function"));
            }
            WindowFunc::Aggregate(agg) => self.aggregate_call(agg, operand, false)?,
        };

        let mut spec = Vec::new();
        if !partition_by.is_empty() {
            spec.push(format!("partition by {}", self.list(partition_by)?));
        }
        if !order_by.is_empty() {
            spec.push(format!("order by {}", self.sort_keys(order_by)?.join(", ")));
        }
        Ok(format!("{call} over ({})", spec.join(" ")))
    }

    pub fn sort_keys(&self, keys: &[SortKey]) -> SqlResult<Vec<String>> {
        keys.iter()
            .map(|key| {
                let direction = match key.direction {
                    Direction::Asc => "asc",
                    Direction::Desc => "desc",
                };
                Ok(format!("{} {direction}", self.render(&key.expr)?))
            })
            .collect()
    }

    fn template(&self, parts: &[TemplatePart]) -> SqlResult<String> {
        let pieces = parts
            .iter()
            .map(|part| match part {
                TemplatePart::Text(text) => Ok(self.dialect.string_literal(text)),
                TemplatePart::Expr(e) => {
                    let sql = self.render(e)?;
                    if self.kind_of(e)? == TyKind::String {
                        Ok(sql)
                    } else {
                        Ok(format!(
                            "cast({sql} as {})",
                            self.dialect.type_name(TyKind::String)
                        ))
                    }
                }
            })
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(match pieces.len() {
            0 => "''".to_string(),
            1 => pieces.concat(),
            _ => format!("({})", pieces.join(" || ")),
        })
    }
}

/// Render a literal of the given column kind
pub(crate) fn literal(dialect: &dyn SqlDialect, value: &Literal, kind: TyKind) -> SqlResult<String> {
    Ok(match value {
        Literal::Null => format!("cast(null as {})", dialect.type_name(kind)),
        Literal::Boolean(b) => b.to_string(),
        Literal::Int(i) if kind == TyKind::Float => float(dialect, *i as f64)?,
        Literal::Int(i) => i.to_string(),
        Literal::Float(x) => float(dialect, *x)?,
        Literal::String(s) => dialect.string_literal(s),
        Literal::Timestamp(_) | Literal::Date(_) => format!(
            "cast({} as {})",
            dialect.string_literal(&value.to_string()),
            dialect.type_name(kind)
        ),
    })
}

fn float(dialect: &dyn SqlDialect, x: f64) -> SqlResult<String> {
    if x.is_finite() {
        Ok(format!("{x:?}"))
    } else {
        Err(SqlError::Unsupported {
            dialect: dialect.name(),
            feature: format!("non-finite float literal {x}"),
        })
    }
}
