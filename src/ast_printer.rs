use crate::ast::{Expr, ExprKind, LiteralValue, Stmt};

/// Renders trees in a parenthesised prefix form, e.g. `(+ 1 (group 2))`.
/// Debug output only; nothing in the evaluator depends on it.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr<'_>) -> String {
        match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                // 3.0 prints as "3.0" here, unlike runtime stringification.
                LiteralValue::Number(n) if n.fract() == 0.0 => format!("{:.1}", n),

                LiteralValue::Number(n) => n.to_string(),
            },

            ExprKind::Grouping(inner) => format!("(group {})", Self::print(inner)),

            ExprKind::Unary { op, right, .. } => format!("({} {})", op, Self::print(right)),

            ExprKind::Binary {
                left, op, right, ..
            } => format!("({} {} {})", op, Self::print(left), Self::print(right)),

            ExprKind::Logical {
                left, op, right, ..
            } => format!("({} {} {})", op, Self::print(left), Self::print(right)),

            ExprKind::Variable(name) => name.lexeme.into(),

            ExprKind::Assign { name, value } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }
        }
    }

    pub fn print_stmt(stmt: &Stmt<'_>) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => Self::list("block", statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", Self::print(condition), Self::print_stmt(body))
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {} {})",
                initializer
                    .as_deref()
                    .map_or_else(|| "_".to_string(), Self::print_stmt),
                condition.as_ref().map_or_else(|| "_".to_string(), Self::print),
                increment.as_ref().map_or_else(|| "_".to_string(), Self::print),
                Self::print_stmt(body)
            ),

            Stmt::Function(decl) => {
                let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme).collect();
                let mut s = format!("(fun {} ({})", decl.name.lexeme, params.join(" "));
                for stmt in &decl.body {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(stmt));
                }
                s.push(')');
                s
            }

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },
        }
    }

    fn list(head: &str, statements: &[Stmt<'_>]) -> String {
        let mut s = format!("({}", head);
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }
}
