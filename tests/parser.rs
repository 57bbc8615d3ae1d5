#[cfg(test)]
mod parser_tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use rox::ast::{Expr, ExprId, ExprKind, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::parser::Parser;
    use rox::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt<'_>>, Vec<LoxError>> {
        let (tokens, errors) = Scanner::new(source).scan_all();
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        Parser::new(tokens).parse()
    }

    fn printed(source: &str) -> Vec<String> {
        parse(source)
            .expect("program should parse")
            .iter()
            .map(AstPrinter::print_stmt)
            .collect()
    }

    fn collect_ids(expr: &Expr<'_>, ids: &mut Vec<ExprId>) {
        ids.push(expr.id);
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => {}
            ExprKind::Grouping(inner) | ExprKind::Unary { right: inner, .. } => {
                collect_ids(inner, ids)
            }
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                collect_ids(left, ids);
                collect_ids(right, ids);
            }
            ExprKind::Assign { value, .. } => collect_ids(value, ids),
            ExprKind::Call {
                callee, arguments, ..
            } => {
                collect_ids(callee, ids);
                for arg in arguments {
                    collect_ids(arg, ids);
                }
            }
        }
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(
            printed("print 1 + 2 * (3 - -4) == !false;"),
            vec!["(print (== (+ 1.0 (* 2.0 (group (- 3.0 (- 4.0))))) (! false)))"]
        );
    }

    #[test]
    fn logical_operators_bind_looser_than_equality() {
        assert_eq!(
            printed("a = b or c and d == e;"),
            vec!["(; (= a (or b (and c (== d e)))))"]
        );
    }

    #[test]
    fn declarations_and_control_flow() {
        let source = r#"
            var x;
            fun add(a, b) { return a + b; }
            if (x) print "yes"; else { print add(1, 2); }
            while (x) x = nil;
            for (var i = 0; i < 3; i = i + 1) print i;
            for (;;) return;
        "#;

        assert_eq!(
            printed(source),
            vec![
                "(var x)",
                "(fun add (a b) (return (+ a b)))",
                "(if x (print yes) (block (print (call add 1.0 2.0))))",
                "(while x (; (= x nil)))",
                "(for (var i 0.0) (< i 3.0) (= i (+ i 1.0)) (print i))",
                "(for _ _ _ (return))",
            ]
        );
    }

    #[test]
    fn every_expression_gets_a_distinct_id() {
        let statements = parse("print a + a; a = a(a, a);").unwrap();

        let mut ids = Vec::new();
        for stmt in &statements {
            match stmt {
                Stmt::Print(expr) | Stmt::Expression(expr) => collect_ids(expr, &mut ids),
                other => panic!("unexpected statement {:?}", other),
            }
        }

        // The assignment target is folded into the Assign node, so it
        // contributes no id of its own.
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 8);
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn ids_continue_from_first_id() {
        let (tokens, _) = Scanner::new("print x;").scan_all();
        let mut parser = Parser::with_first_id(tokens, ExprId(40));
        let statements = parser.parse().unwrap();

        match &statements[0] {
            Stmt::Print(expr) => assert_eq!(expr.id, ExprId(40)),
            other => panic!("unexpected statement {:?}", other),
        }
        assert_eq!(parser.next_id(), ExprId(41));
    }

    #[test]
    fn reports_every_error_after_synchronizing() {
        let errors = parse("var = 1;\nprint 2;\nprint (3;\n1 = 2;").unwrap_err();

        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 3] Error at ';': Expect ')' after expression.",
                "[line 4] Error at '=': Invalid assignment target.",
            ]
        );
        assert!(errors.iter().all(|e| e.exit_code() == 65));
    }

    #[test]
    fn error_at_end_of_input() {
        let errors = parse("print 1").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at end: Expect ';' after value."
        );
    }

    #[test]
    fn parse_expression_rejects_trailing_tokens() {
        let (tokens, _) = Scanner::new("1 + 2").scan_all();
        let expr = Parser::new(tokens).parse_expression().unwrap();
        assert_eq!(AstPrinter::print(&expr), "(+ 1.0 2.0)");

        let (tokens, _) = Scanner::new("1 2").scan_all();
        assert!(Parser::new(tokens).parse_expression().is_err());
    }

    #[test]
    fn too_many_arguments() {
        let args = vec!["1"; 256].join(", ");
        let source = format!("f({});", args);

        let errors = parse(&source).unwrap_err();
        assert!(errors[0].to_string().contains("more than 255 arguments"));
    }
}
