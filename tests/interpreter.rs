#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use rox::ast::{ExprId, Stmt};
    use rox::error::{LoxError, Operand};
    use rox::interpreter::Interpreter;
    use rox::parser::Parser;
    use rox::resolver::{Locals, Resolver};
    use rox::scanner::Scanner;
    use rox::session::Session;
    use rox::token::{Token, TokenType};
    use rox::value::Value;

    /// Runs `source` in a fresh session, returning what it printed and how it
    /// finished.
    fn run(source: &str) -> (String, Result<(), Vec<LoxError>>) {
        let mut session = Session::new(Vec::new());
        let result = session.run(source);
        let printed = String::from_utf8(session.into_output()).expect("output is UTF-8");
        (printed, result)
    }

    fn output_of(source: &str) -> String {
        let (printed, result) = run(source);
        if let Err(errors) = result {
            panic!("program failed: {:?}", errors);
        }
        printed
    }

    fn single_error(source: &str) -> (String, LoxError) {
        let (printed, result) = run(source);
        let mut errors = result.expect_err("program should fail");
        assert_eq!(errors.len(), 1, "expected exactly one error: {:?}", errors);
        (printed, errors.remove(0))
    }

    #[test]
    fn closures_keep_their_counter() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    print i;
                }
                return count;
            }

            var counter = makeCounter();
            counter();
            counter();
        "#;

        assert_eq!(output_of(source), "1\n2\n");
    }

    #[test]
    fn closures_share_the_captured_scope() {
        let source = r#"
            var get;
            var set;
            fun make() {
                var v = "a";
                fun g() { return v; }
                fun s(x) { v = x; }
                get = g;
                set = s;
            }

            make();
            set("b");
            print get();
        "#;

        assert_eq!(output_of(source), "b\n");
    }

    #[test]
    fn each_call_gets_a_fresh_closure_scope() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }

            var a = makeCounter();
            var b = makeCounter();
            a();
            a();
            print a();
            print b();
        "#;

        assert_eq!(output_of(source), "3\n1\n");
    }

    #[test]
    fn closure_binding_is_fixed_before_shadowing() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
                print a;
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\nblock\n");
    }

    #[test]
    fn self_initialization_is_rejected_before_anything_runs() {
        let (printed, error) = single_error("print \"before\";\nvar a = 1;\n{ var a = a; }");

        assert_eq!(printed, "");
        assert!(matches!(error, LoxError::Resolve { ref name, line: 3, .. } if name == "a"));
        assert_eq!(error.exit_code(), 70);
    }

    #[test]
    fn initializer_may_read_an_outer_name() {
        assert_eq!(output_of("var a = 1; var b = a; print b;"), "1\n");
        assert_eq!(
            output_of("var a = 1; { var b = a; print b; }"),
            "1\n"
        );
    }

    #[test]
    fn redeclaration_overwrites() {
        assert_eq!(output_of("var a = 1; var a = 2; print a;"), "2\n");
        assert_eq!(output_of("{ var a = 1; var a = 2; print a; }"), "2\n");
    }

    #[test]
    fn equality_rules() {
        let source = r#"
            print nil == nil;
            print nil == false;
            print 1 == "1";
            print "a" == "a";
            print 0 == -0;
            print 1 != 2;
            print clock == clock;
            fun f() {}
            print f == f;
            fun mk() { fun g() {} return g; }
            print mk() == mk();
        "#;

        assert_eq!(
            output_of(source),
            "true\nfalse\nfalse\ntrue\ntrue\ntrue\ntrue\ntrue\nfalse\n"
        );
    }

    #[test]
    fn plus_adds_or_concatenates() {
        assert_eq!(output_of("print 1 + 2; print \"ab\" + \"c\";"), "3\nabc\n");
    }

    #[test]
    fn plus_type_errors_name_the_offending_side() {
        let (_, error) = single_error("print \"ab\" + 3;");
        assert!(matches!(
            error,
            LoxError::Type {
                side: Some(Operand::Right),
                ..
            }
        ));
        assert_eq!(
            error.to_string(),
            "[line 1] Error at '+': Right operand must be a string."
        );

        let (_, error) = single_error("print 3 + \"ab\";");
        assert!(matches!(
            error,
            LoxError::Type {
                side: Some(Operand::Right),
                ..
            }
        ));

        let (_, error) = single_error("print nil + 1;");
        assert!(matches!(
            error,
            LoxError::Type {
                side: Some(Operand::Left),
                ..
            }
        ));

        let (_, error) = single_error("print nil + true;");
        assert!(matches!(error, LoxError::Type { side: None, .. }));
    }

    #[test]
    fn arithmetic_and_comparison_need_numbers() {
        let (_, error) = single_error("print 1 < \"2\";");
        assert!(matches!(
            error,
            LoxError::Type {
                side: Some(Operand::Right),
                ..
            }
        ));

        let (_, error) = single_error("print -\"x\";");
        assert_eq!(
            error.to_string(),
            "[line 1] Error at '-': Operand must be a number."
        );
    }

    #[test]
    fn division_by_zero_stops_execution() {
        let (printed, error) = single_error("print 1;\nprint 1 / 0;\nprint 2;");

        assert_eq!(printed, "1\n");
        assert!(matches!(error, LoxError::DivisionByZero { line: 2 }));
        assert_eq!(error.exit_code(), 70);
    }

    #[test]
    fn for_loop_runs_and_its_variable_does_not_leak() {
        let (printed, error) =
            single_error("for (var i = 0; i < 3; i = i + 1) print i;\nprint i;");

        assert_eq!(printed, "0\n1\n2\n");
        assert!(matches!(error, LoxError::UnresolvedName { ref name, line: 2 } if name == "i"));
    }

    #[test]
    fn for_loop_without_clauses_exits_through_return() {
        let source = r#"
            fun firstOver(limit) {
                var n = 1;
                for (;;) {
                    n = n * 2;
                    if (n > limit) return n;
                }
            }
            print firstOver(100);
        "#;

        assert_eq!(output_of(source), "128\n");
    }

    #[test]
    fn while_loop() {
        assert_eq!(
            output_of("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn arity_is_checked_before_the_body_runs() {
        let (printed, error) = single_error("fun f(a, b) { print \"body\"; }\nf(1);");

        assert_eq!(printed, "");
        assert!(matches!(
            error,
            LoxError::ArityMismatch {
                expected: 2,
                got: 1,
                line: 2
            }
        ));
        assert_eq!(
            error.to_string(),
            "[line 2] Expected 2 arguments but got 1."
        );

        let (_, error) = single_error("clock(1);");
        assert!(matches!(
            error,
            LoxError::ArityMismatch {
                expected: 0,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn only_callables_can_be_called() {
        let (_, error) = single_error("var x = \"x\";\nx();");
        assert!(matches!(error, LoxError::NotCallable { line: 2 }));

        let (_, error) = single_error("nil();");
        assert!(matches!(error, LoxError::NotCallable { .. }));
    }

    #[test]
    fn return_unwinds_through_loops_and_blocks() {
        let source = r#"
            fun peek() { print after; }

            fun find() {
                var i = 0;
                while (true) {
                    for (var j = 0; j < 10; j = j + 1) {
                        if (j == 3) {
                            {
                                return i * 10 + j;
                            }
                        }
                    }
                    i = i + 1;
                }
            }

            print find();
            var after = "ok";
            peek();
        "#;

        assert_eq!(output_of(source), "3\nok\n");
    }

    #[test]
    fn return_restores_scopes_it_unwinds_through() {
        let source = r#"
            {
                var x = "outer";
                fun f() {
                    {
                        var x = "inner";
                        return 1;
                    }
                }
                f();
                print x;
            }
        "#;

        assert_eq!(output_of(source), "outer\n");
    }

    #[test]
    fn return_from_a_loop_restores_the_caller_scope() {
        let source = r#"
            {
                var i = "caller";
                fun g() {
                    for (var i = 0; i < 5; i = i + 1) {
                        var i = "body";
                        return i;
                    }
                }
                print g();
                print i;
            }
        "#;

        assert_eq!(output_of(source), "body\ncaller\n");
    }

    #[test]
    fn stray_return_at_top_level_is_an_internal_error() {
        let (tokens, _) = Scanner::new("fun f() { return 7; }").scan_all();
        let program = Parser::new(tokens).parse().unwrap();
        let ret = match &program[0] {
            Stmt::Function(decl) => decl.body[0].clone(),
            other => panic!("unexpected statement {:?}", other),
        };

        let mut interpreter = Interpreter::with_output(Vec::new());
        let error = interpreter.interpret(&[ret], Locals::new()).unwrap_err();
        assert!(matches!(error, LoxError::Runtime(_)));
        assert_eq!(error.exit_code(), 70);

        let (tokens, _) = Scanner::new("var after = 2; print after;").scan_all();
        let mut parser = Parser::with_first_id(tokens, ExprId(100));
        let program = parser.parse().unwrap();
        let locals = Resolver::new().resolve(&program).unwrap();
        interpreter.interpret(&program, locals).unwrap();

        let after = Token::new(TokenType::IDENTIFIER, "after", 1, 1);
        let global = interpreter.globals().borrow().get(&after).unwrap();
        assert_eq!(global, Value::Number(2.0));
        assert_eq!(
            String::from_utf8(interpreter.into_output()).unwrap(),
            "2\n"
        );
    }

    #[test]
    fn function_without_return_yields_nil() {
        assert_eq!(
            output_of("fun f() {} print f(); fun g() { return; } print g();"),
            "nil\nnil\n"
        );
    }

    #[test]
    fn recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);
        "#;

        assert_eq!(output_of(source), "610\n");
    }

    #[test]
    fn runaway_recursion_is_a_stack_overflow() {
        let (_, error) = single_error("fun f() { f(); }\nf();");

        assert!(matches!(error, LoxError::StackOverflow { line: 1 }));
        assert_eq!(error.exit_code(), 70);
    }

    #[test]
    fn truthiness() {
        let source = r#"
            if (0) print "zero";
            if ("") print "empty";
            if (nil) print "nil"; else print "falsy";
            print !nil;
            print !0;
        "#;

        assert_eq!(output_of(source), "zero\nempty\nfalsy\ntrue\nfalse\n");
    }

    #[test]
    fn logical_operators_short_circuit_and_return_operands() {
        let source = r#"
            print true or undefinedName;
            print false and undefinedName;
            print nil or "x";
            print 1 and 2;
        "#;

        assert_eq!(output_of(source), "true\nfalse\nx\n2\n");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(
            output_of("print 3; print 2.5; print 1 + 2; print -0.5; print 10 / 4;"),
            "3\n2.5\n3\n-0.5\n2.5\n"
        );
    }

    #[test]
    fn callables_print_their_form() {
        assert_eq!(
            output_of("fun greet() {} print greet; print clock;"),
            "<fn greet>\n<native fn>\n"
        );
    }

    #[test]
    fn clock_reports_a_positive_time() {
        assert_eq!(output_of("print clock() > 0;"), "true\n");
    }

    #[test]
    fn assigning_an_undeclared_name_fails() {
        let (_, error) = single_error("ghost = 1;");

        assert!(matches!(error, LoxError::UnresolvedName { ref name, .. } if name == "ghost"));
        assert_eq!(error.to_string(), "[line 1] Undefined variable 'ghost'.");
    }

    #[test]
    fn environment_is_restored_after_an_error() {
        let mut session = Session::new(Vec::new());

        let errors = session
            .run("var x = 1; { var y = 2; print y / nil; }")
            .unwrap_err();
        assert!(matches!(errors[0], LoxError::Type { .. }));

        session.run("var z = 3; print z;").unwrap();

        let z = Token::new(TokenType::IDENTIFIER, "z", 1, 1);
        let global = session.interpreter().globals().borrow().get(&z).unwrap();
        assert_eq!(global, Value::Number(3.0));

        assert_eq!(String::from_utf8(session.into_output()).unwrap(), "3\n");
    }

    #[test]
    fn state_persists_across_runs() {
        let mut session = Session::new(Vec::new());

        session
            .run("var count = 0; fun bump() { count = count + 1; return count; }")
            .unwrap();
        session.run("bump();").unwrap();
        session.run("print bump();").unwrap();

        assert_eq!(String::from_utf8(session.into_output()).unwrap(), "2\n");
    }

    #[test]
    fn syntax_errors_use_the_syntax_exit_code() {
        let (printed, result) = run("print 1;\nprint (;");
        let errors = result.unwrap_err();

        assert_eq!(printed, "");
        assert!(errors.iter().all(|e| e.exit_code() == 65));
    }

    #[test]
    fn evaluates_a_standalone_expression() {
        let (tokens, _) = Scanner::new("(1 + 2) * 3 == 9").scan_all();
        let expr = Parser::new(tokens).parse_expression().unwrap();

        let mut interpreter = Interpreter::with_output(Vec::new());
        assert_eq!(
            interpreter.evaluate_expression(&expr).unwrap(),
            Value::Bool(true)
        );
    }
}
