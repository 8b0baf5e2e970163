//! Crate macros.

/// Imports the crate's prelude.
#[macro_export]
macro_rules! prelude {
    {} => { use $crate::prelude::*; };
    { pub } => { pub use $crate::prelude::*; };
}

/// Returns early with a formatted message error.
///
/// Works in any function whose error type can be built from a `String`.
#[macro_export]
macro_rules! bail {
    ($($fmt:tt)*) => {
        return Err(format!($($fmt)*).into())
    };
}

/// Convenience macro, provides a DSL for writing expressions.
///
/// - uninstantiated variables are written `(var_name: var_typ)`, without any quotes;
/// - SSA-instantiated variables are written `(var_name @ idx: var_typ)`.
///
/// Applications are built as is, no simplification takes place.
///
/// # Examples
///
/// ```rust
/// # use ctigar::build_expr;
/// let expr = build_expr!((and (= (x@2: int) (+ (x@1: int) 1)) (b: bool)));
/// assert_eq!(&expr.to_string(), "(and (= x@2 (+ x@1 1)) b)");
/// ```
#[macro_export]
macro_rules! build_expr {
    (true) => ( $crate::expr::Expr::from(true) );
    (false) => ( $crate::expr::Expr::from(false) );

    ( ($var:ident : $typ:ident) ) => (
        $crate::expr::Expr::new_var(
            $crate::expr::Var::new(stringify!($var), $crate::build_typ!($typ))
        )
    );
    ( ($var:ident @ $idx:literal : $typ:ident) ) => (
        $crate::expr::Expr::new_var(
            $crate::expr::Var::new_at(stringify!($var), $crate::build_typ!($typ), $idx)
        )
    );

    ( ($op:tt $($args:tt)*) ) => (
        $crate::expr::Expr::from((
            $crate::build_expr!(@op $op),
            vec![ $($crate::build_expr!($args)),* ],

        ))
    );

    ($cst:expr) => ( $crate::expr::Expr::from($cst) );

    (@op ite) => ( $crate::expr::Op::Ite );
    (@op =>) => ( $crate::expr::Op::Implies );
    (@op +) => ( $crate::expr::Op::Add );
    (@op -) => ( $crate::expr::Op::Sub );
    (@op *) => ( $crate::expr::Op::Mul );
    (@op /) => ( $crate::expr::Op::Div );
    (@op div) => ( $crate::expr::Op::IDiv );
    (@op %) => ( $crate::expr::Op::Mod );
    (@op mod) => ( $crate::expr::Op::Mod );
    (@op >=) => ( $crate::expr::Op::Ge );
    (@op <=) => ( $crate::expr::Op::Le );
    (@op >) => ( $crate::expr::Op::Gt );
    (@op <) => ( $crate::expr::Op::Lt );
    (@op =) => ( $crate::expr::Op::Eq );
    (@op not) => ( $crate::expr::Op::Not );
    (@op and) => ( $crate::expr::Op::And );
    (@op or) => ( $crate::expr::Op::Or );
    (@op !) => ( $crate::expr::Op::Not );
    (@op &&) => ( $crate::expr::Op::And );
    (@op ||) => ( $crate::expr::Op::Or );
}

/// Builds a type.
#[macro_export]
macro_rules! build_typ {
    (bool) => {
        $crate::expr::Typ::Bool
    };
    (int) => {
        $crate::expr::Typ::Int
    };
    (rat) => {
        $crate::expr::Typ::Rat
    };
}
