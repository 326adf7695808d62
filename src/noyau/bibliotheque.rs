// src/noyau/bibliotheque.rs
//
// Bibliothèque standard (figée pour compatibilité) :
// - opérateurs : ! * / % + - ^ > >= < <= = == != <> && ||
// - fonctions  : MATCH NOT IF RANDOM SIN COS TAN ASIN ACOS ATAN ATAN2 RAD DEG
//                MAX MIN ONEOF ABS ROUND FLOOR CEILING SQRT CLAMP LOG LOG10 EXP
// - constantes : PI e TRUE FALSE
//
// Trigonométrie en DEGRÉS (entrée de SIN/COS/TAN, sortie de ASIN/ACOS/ATAN/ATAN2).

use std::cmp::Ordering;

use regex::Regex;

use super::erreur::{ExpressionError, Result};
use super::registre::{Arity, Associativity, Function, Operator, Registry};
use super::variant::{Variant, FALSE, TRUE};

/* ------------------------ Précédences ------------------------ */

pub const PRECEDENCE_OR: i32 = 2;
pub const PRECEDENCE_AND: i32 = 4;
pub const PRECEDENCE_EQUALITY: i32 = 7;
pub const PRECEDENCE_COMPARISON: i32 = 10;
pub const PRECEDENCE_ADDITIVE: i32 = 20;
pub const PRECEDENCE_NOT: i32 = 20;
pub const PRECEDENCE_MULTIPLICATIVE: i32 = 30;
pub const PRECEDENCE_POWER: i32 = 40;

/// Remplit `r` avec les opérateurs, fonctions et constantes standard.
pub fn install(r: &mut Registry) {
    operateurs(r);
    fonctions(r);

    r.set_variable("PI", Variant::Number(std::f32::consts::PI));
    r.set_variable("e", Variant::Number(std::f32::consts::E));
    r.set_variable("TRUE", TRUE);
    r.set_variable("FALSE", FALSE);
}

/// Constantes installées par `install` (exclues des variables "utilisées").
pub fn is_constant(name: &str) -> bool {
    ["PI", "E", "TRUE", "FALSE"]
        .iter()
        .any(|c| c.eq_ignore_ascii_case(name))
}

/* ------------------------ Opérateurs ------------------------ */

fn operateurs(r: &mut Registry) {
    use Associativity::{Left, Right};

    r.add_operator(Operator::binary("+", PRECEDENCE_ADDITIVE, Left, |a, b| a.add(b)));
    r.add_operator(Operator::binary("-", PRECEDENCE_ADDITIVE, Left, |a, b| {
        Ok(Variant::Number(a.as_number()? - b.as_number()?))
    }));
    r.add_operator(Operator::binary("*", PRECEDENCE_MULTIPLICATIVE, Left, |a, b| {
        Ok(Variant::Number(a.as_number()? * b.as_number()?))
    }));
    r.add_operator(Operator::binary("/", PRECEDENCE_MULTIPLICATIVE, Left, |a, b| {
        Ok(Variant::Number(a.as_number()? / b.as_number()?))
    }));
    r.add_operator(Operator::binary("%", PRECEDENCE_MULTIPLICATIVE, Left, |a, b| {
        Ok(Variant::Number(a.as_number()? % b.as_number()?))
    }));
    r.add_operator(Operator::binary("^", PRECEDENCE_POWER, Right, |a, b| {
        Ok(Variant::Number(a.as_number()?.powf(b.as_number()?)))
    }));

    // NaN (None) : seules les différences sont vraies
    comparaison(r, ">", PRECEDENCE_COMPARISON, |o| o == Some(Ordering::Greater));
    comparaison(r, ">=", PRECEDENCE_COMPARISON, |o| {
        matches!(o, Some(Ordering::Greater | Ordering::Equal))
    });
    comparaison(r, "<", PRECEDENCE_COMPARISON, |o| o == Some(Ordering::Less));
    comparaison(r, "<=", PRECEDENCE_COMPARISON, |o| {
        matches!(o, Some(Ordering::Less | Ordering::Equal))
    });
    comparaison(r, "=", PRECEDENCE_EQUALITY, |o| o == Some(Ordering::Equal));
    comparaison(r, "==", PRECEDENCE_EQUALITY, |o| o == Some(Ordering::Equal));
    comparaison(r, "!=", PRECEDENCE_EQUALITY, |o| o != Some(Ordering::Equal));
    comparaison(r, "<>", PRECEDENCE_EQUALITY, |o| o != Some(Ordering::Equal));

    r.add_operator(
        Operator::binary("&&", PRECEDENCE_AND, Left, |a, b| {
            Ok(Variant::from_bool(a.as_boolean() && b.as_boolean()))
        })
        .boolean(),
    );
    r.add_operator(
        Operator::binary("||", PRECEDENCE_OR, Left, |a, b| {
            Ok(Variant::from_bool(a.as_boolean() || b.as_boolean()))
        })
        .boolean(),
    );
    r.add_operator(
        Operator::unary("!", PRECEDENCE_NOT, |a| Ok(Variant::from_bool(!a.as_boolean()))).boolean(),
    );
}

fn comparaison(
    r: &mut Registry,
    symbol: &str,
    precedence: i32,
    test: fn(Option<Ordering>) -> bool,
) {
    r.add_operator(
        Operator::binary(symbol, precedence, Associativity::Left, move |a, b| {
            Ok(Variant::from_bool(test(a.compare_to(b))))
        })
        .boolean(),
    );
}

/* ------------------------ Fonctions ------------------------ */

fn fonctions(r: &mut Registry) {
    r.add_function(
        Function::eager("MATCH", Arity::Exactly(2), |a| {
            let motif = arg(a, 0)?.as_string();
            let texte = arg(a, 1)?.as_string();
            // correspondance sur la chaîne entière
            let re = Regex::new(&format!("^(?:{motif})$")).map_err(|e| {
                ExpressionError::new(format!("invalid regular expression \"{motif}\": {e}"))
            })?;
            Ok(Variant::from_bool(re.is_match(&texte)))
        })
        .boolean(),
    );

    r.add_function(
        Function::eager("NOT", Arity::Exactly(1), |a| {
            Ok(Variant::from_bool(!arg(a, 0)?.as_boolean()))
        })
        .boolean(),
    );

    // Seule la branche retenue est forcée.
    r.add_function(Function::lazy("IF", Arity::Exactly(3), |a| {
        let cond = a
            .first()
            .ok_or_else(|| ExpressionError::new("IF requires three parameters"))?;
        let branche = if cond.eval()?.as_boolean() { 1 } else { 2 };
        a.get(branche)
            .ok_or_else(|| ExpressionError::new("IF requires three parameters"))?
            .eval()
    }));

    r.add_function(Function::eager("RANDOM", Arity::Exactly(0), |_| {
        Ok(Variant::Number(rand::random::<f32>()))
    }));

    unaire(r, "SIN", |x| x.to_radians().sin());
    unaire(r, "COS", |x| x.to_radians().cos());
    unaire(r, "TAN", |x| x.to_radians().tan());
    unaire(r, "ASIN", |x| x.asin().to_degrees());
    unaire(r, "ACOS", |x| x.acos().to_degrees());
    unaire(r, "ATAN", |x| x.atan().to_degrees());
    unaire(r, "RAD", f32::to_radians);
    unaire(r, "DEG", f32::to_degrees);
    unaire(r, "ABS", f32::abs);
    unaire(r, "ROUND", f32::round);
    unaire(r, "FLOOR", f32::floor);
    unaire(r, "CEILING", f32::ceil);
    unaire(r, "EXP", f32::exp);

    r.add_function(Function::eager("ATAN2", Arity::Exactly(2), |a| {
        let y = arg(a, 0)?.as_number()?;
        let x = arg(a, 1)?.as_number()?;
        Ok(Variant::Number(y.atan2(x).to_degrees()))
    }));

    r.add_function(Function::eager("SQRT", Arity::Exactly(1), |a| {
        let x = arg(a, 0)?.as_number()?;
        if x < 0.0 {
            return Err(ExpressionError::new("SQRT of a negative number"));
        }
        Ok(Variant::Number(x.sqrt()))
    }));

    r.add_function(Function::eager("LOG", Arity::Exactly(1), |a| {
        Ok(Variant::Number(positif(arg(a, 0)?, "LOG")?.ln()))
    }));
    r.add_function(Function::eager("LOG10", Arity::Exactly(1), |a| {
        Ok(Variant::Number(positif(arg(a, 0)?, "LOG10")?.log10()))
    }));

    r.add_function(Function::eager("CLAMP", Arity::Exactly(3), |a| {
        let x = arg(a, 0)?.as_number()?;
        let lo = arg(a, 1)?.as_number()?;
        let hi = arg(a, 2)?.as_number()?;
        // num_traits::clamp exige lo <= hi (NaN compris)
        if !(lo <= hi) {
            return Err(ExpressionError::new(
                "CLAMP lower bound must not exceed upper bound",
            ));
        }
        Ok(Variant::Number(num_traits::clamp(x, lo, hi)))
    }));

    r.add_function(Function::eager("MAX", Arity::AtLeast(1), |a| {
        extremum(a, "MAX", Ordering::Greater)
    }));
    r.add_function(Function::eager("MIN", Arity::AtLeast(1), |a| {
        extremum(a, "MIN", Ordering::Less)
    }));

    // ONEOF(x, a, b, ...) : x est-il égal à l'un des suivants ?
    r.add_function(
        Function::eager("ONEOF", Arity::AtLeast(2), |a| {
            let (x, candidats) = a
                .split_first()
                .filter(|(_, reste)| !reste.is_empty())
                .ok_or_else(|| ExpressionError::new("ONEOF requires at least two parameters"))?;
            Ok(Variant::from_bool(
                candidats.iter().any(|c| x.compare_to(c) == Some(Ordering::Equal)),
            ))
        })
        .boolean(),
    );
}

fn unaire(r: &mut Registry, name: &str, f: fn(f32) -> f32) {
    r.add_function(Function::eager(name, Arity::Exactly(1), move |a| {
        Ok(Variant::Number(f(arg(a, 0)?.as_number()?)))
    }));
}

fn arg(a: &[Variant], i: usize) -> Result<&Variant> {
    a.get(i)
        .ok_or_else(|| ExpressionError::new(format!("missing parameter {}", i + 1)))
}

fn positif(v: &Variant, nom: &str) -> Result<f32> {
    let x = v.as_number()?;
    if x <= 0.0 {
        return Err(ExpressionError::new(format!(
            "{nom} of a non-positive number"
        )));
    }
    Ok(x)
}

/// MAX / MIN numériques ; `garde` est l'ordre qui fait remplacer le meilleur courant.
fn extremum(a: &[Variant], nom: &str, garde: Ordering) -> Result<Variant> {
    let mut iter = a.iter();
    let premier = iter
        .next()
        .ok_or_else(|| ExpressionError::new(format!("{nom} requires at least one parameter")))?;
    let mut meilleur = premier.as_number()?;
    for v in iter {
        let x = v.as_number()?;
        if x.partial_cmp(&meilleur) == Some(garde) {
            meilleur = x;
        }
    }
    Ok(Variant::Number(meilleur))
}
