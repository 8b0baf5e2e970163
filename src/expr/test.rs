//! Tests over expressions.

crate::prelude!();

#[test]
fn typing_implies() {
    let lft = build_expr!((a: bool));
    let rgt = build_expr!((> (n: int) 7));

    let typ = expr::Op::Implies.type_check(&[lft, rgt]).unwrap();

    assert_eq!(typ, expr::Typ::Bool);
}

#[test]
fn typing_ite() {
    let cnd = build_expr!((a: bool));
    let thn = build_expr!((+ (n_1: int) 2));
    let els = build_expr!((- (n_2: int) 10));

    let typ = expr::Op::Ite.type_check(&[cnd, thn, els]).unwrap();

    assert_eq!(typ, expr::Typ::Int);

    let cnd = build_expr!((a: bool));
    let thn = build_expr!((and (b: bool) true));
    let els = build_expr!((or (c: bool) (d: bool)));

    let typ = expr::Op::Ite.type_check(&[cnd, thn, els]).unwrap();

    assert_eq!(typ, expr::Typ::Bool);
}

#[test]
fn typing_ite_fail() {
    let cnd = build_expr!((a: int));
    let thn = build_expr!((+ (n_1: int) 2));
    let els = build_expr!((- (n_2: int) 10));

    let err = expr::Op::Ite.type_check(&[cnd, thn, els]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "expected first argument of type `bool`, got `int`",
    );

    let cnd = build_expr!((a: bool));
    let thn = build_expr!((and (b: bool) true));
    let els = build_expr!((n: int));

    let err = expr::Op::Ite.type_check(&[cnd, thn, els]).unwrap_err();

    assert_eq!(
        err.to_string(),
        "`ite`'s second and third arguments should have the same type, got `bool` and `int`",
    );
}

#[test]
fn typing_cmp() {
    let a_1 = build_expr!((+ (a: int) 2));
    let a_2 = build_expr!((-(b: int)(c: int)));
    let a_3 = build_expr!((* (n: int) 7));

    let typ = expr::Op::Ge.type_check(&[a_1, a_2, a_3]).unwrap();
    assert_eq!(typ, expr::Typ::Bool);
}

#[test]
fn smart_constructors() {
    let a = build_expr!((a: bool));
    let b = build_expr!((b: bool));

    assert_eq!(Expr::and(vec![a.clone(), Expr::fls(), b.clone()]), Expr::fls());
    assert_eq!(Expr::or(vec![a.clone(), Expr::tru()]), Expr::tru());
    assert_eq!(Expr::and(vec![a.clone(), a.clone()]), a);
    assert_eq!(Expr::not(Expr::not(b.clone())), b);

    let nested = Expr::or(vec![Expr::or(vec![a.clone(), b.clone()]), Expr::fls()]);
    assert_eq!(&nested.to_string(), "(or a b)");
}

#[test]
fn conjuncts_and_literals() {
    let expr = build_expr!(
        (and (and (< (x: int) 3) (not (b: bool))) (or (= (y: int) 0) (c: bool)))
    );
    let conjs = expr.conjuncts();
    assert_eq!(conjs.len(), 3);
    assert!(conjs[0].is_literal());
    assert!(conjs[1].is_literal());
    assert!(!conjs[2].is_literal());
    assert!(!expr.is_purely_conjunctive());

    let atoms = expr.atoms();
    assert_eq!(atoms.len(), 4);

    let filtered = expr.filter_literals(|lit| !lit.mentions("b"));
    assert_eq!(&filtered.to_string(), "(and (< x 3) (or (= y 0) c))");

    assert!(Expr::tru().conjuncts().is_empty());
}

#[test]
fn numeral_equalities() {
    let eq = build_expr!((= (x: int) (y: int)));
    let split = eq.split_numeral_equality();
    assert_eq!(split.len(), 2);
    assert_eq!(&split[0].to_string(), "(<= x y)");
    assert_eq!(&split[1].to_string(), "(>= x y)");

    let iff = build_expr!((= (a: bool) (b: bool)));
    assert_eq!(iff.split_numeral_equality(), vec![iff.clone()]);
}

#[test]
fn partial_eval() {
    let x = Var::new_at("x", Typ::Int, 1);
    let model = |var: &Var| {
        if var == &x {
            Some(Cst::int(7))
        } else {
            None
        }
    };

    let expr = build_expr!((or (< (x@1: int) 10) (= (y@1: int) 2)));
    assert_eq!(expr.eval(&model), Some(Cst::B(true)));

    let expr = build_expr!((and (< (x@1: int) 10) (= (y@1: int) 2)));
    assert_eq!(expr.eval(&model), None);

    let expr = build_expr!((and (>= (x@1: int) 10) (= (y@1: int) 2)));
    assert_eq!(expr.eval(&model), Some(Cst::B(false)));

    let expr = build_expr!((= (mod (x@1: int) 3) 1));
    assert_eq!(expr.eval(&model), Some(Cst::B(true)));

    let expr = build_expr!((= (div (- 7) 2) (- 4)));
    assert_eq!(expr.eval(&model), Some(Cst::B(true)));
}

#[test]
fn smt_printing() {
    use rsmt2::print::Expr2Smt;
    let expr = build_expr!((and (= (x@2: int) (+ (x@1: int) 1)) (not (b: bool))));
    let mut buf: Vec<u8> = vec![];
    expr.expr_to_smt2(&mut buf, ()).unwrap();
    assert_eq!(
        String::from_utf8_lossy(&buf),
        "(and (= x@2 (+ x@1 1)) (not b))"
    );
}
