//! Noyau du moteur d'expressions
//!
//! Organisation interne :
//! - erreur.rs       : ExpressionError (message + position)
//! - variant.rs      : valeur dynamique (nombre / texte / booléen)
//! - jetons.rs       : tokenisation
//! - registre.rs     : opérateurs, fonctions, variables + registre global
//! - bibliotheque.rs : bibliothèque standard (opérateurs, fonctions, constantes)
//! - rpn.rs          : shunting-yard, symboles résolus une fois
//! - validation.rs   : forme de pile + arités, sans évaluer
//! - arbre.rs        : arbre d'évaluation (itératif, paresseux pour IF & co)
//! - expression.rs   : façade + caches (RPN, arbre, compilation partagée)

pub mod arbre;
pub mod bibliotheque;
pub mod erreur;
pub mod expression;
pub mod jetons;
pub mod registre;
pub mod rpn;
pub mod validation;
pub mod variant;

#[cfg(test)]
mod tests_proprietes;

#[cfg(test)]
mod tests_fuzz_safe;

// API publique
pub use arbre::Deferred;
pub use erreur::{ExpressionError, Result};
pub use expression::{Expression, VariableValue};
pub use registre::{
    global, install_global, Arity, Associativity, Function, Operator, Registry,
};
pub use variant::{Variant, FALSE, TRUE};
