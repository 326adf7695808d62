//! Moteur d'expressions : texte -> RPN validée -> arbre -> `Variant`.
//!
//! ```
//! use moteur_expressions::{Expression, Variant};
//!
//! let mut e = Expression::new("IF(x > 2, MAX(x, 10), 0)");
//! e.set_variable("x", 3.0);
//! assert_eq!(e.eval().unwrap(), Variant::Number(10.0));
//! ```

pub mod noyau;

pub use noyau::{
    global, install_global, Arity, Associativity, Deferred, Expression, ExpressionError,
    Function, Operator, Registry, Result, VariableValue, Variant, FALSE, TRUE,
};
