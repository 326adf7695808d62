// src/noyau/validation.rs
//
// Validation de la RPN SANS évaluer : simulation de pile.
// Une "portée" par appel de fonction ouvert ; chaque portée compte ses valeurs.
//
// - valeur / variable / identifiant : +1
// - opérateur binaire : exige >= 2, net -1 ; unaire : exige >= 1, net 0
// - marqueur d'appel : ouvre une portée (0)
// - fonction : ferme la portée, vérifie l'arité, +1 dans la portée englobante
// - appels paresseux : profondeur d'imbrication bornée (MAX_LAZY_DEPTH)
// - fin : une seule portée, une seule valeur

use super::erreur::{ExpressionError, Result};
use super::registre::Arity;
use super::rpn::{RpnToken, Symbol};

/// Imbrication maximale d'appels paresseux (IF dans IF...).
/// Chaque niveau paresseux ré-entre l'évaluateur sur la pile native.
pub const MAX_LAZY_DEPTH: usize = 128;

/// Portée d'un appel ouvert (ou portée racine).
#[derive(Default)]
struct Portee {
    /// valeurs empilées dans cette portée
    valeurs: usize,
    /// imbrication paresseuse la plus profonde parmi ses arguments
    paresse: usize,
}

pub fn validate(rpn: &[RpnToken]) -> Result<()> {
    let mut portees: Vec<Portee> = vec![Portee::default()];

    for t in rpn {
        match &t.symbol {
            Symbol::Number(_) | Symbol::Str(_) | Symbol::Variable(_) | Symbol::Unresolved(_) => {
                courante(&mut portees, t)?.valeurs += 1;
            }

            Symbol::Operator(op) => {
                let p = courante(&mut portees, t)?;
                if p.valeurs < op.operands() {
                    return Err(ExpressionError::at(
                        format!("missing parameter(s) for operator {}", op.symbol()),
                        t.position,
                    ));
                }
                p.valeurs = p.valeurs + 1 - op.operands();
            }

            Symbol::CallStart => portees.push(Portee::default()),

            Symbol::Function(f) => {
                // la portée racine ne se ferme jamais : sans marqueur d'appel, liste manquante
                if portees.len() < 2 {
                    return Err(ExpressionError::at(
                        format!("missing parameter(s) for function {}", f.name()),
                        t.position,
                    ));
                }
                let fermee = portees.pop().unwrap_or_default();
                let recus = fermee.valeurs;
                match f.arity() {
                    Arity::Exactly(k) if k != recus => {
                        return Err(ExpressionError::at(
                            format!("function {} expected {k} parameters, got {recus}", f.name()),
                            t.position,
                        ));
                    }
                    Arity::AtLeast(k) if recus < k => {
                        return Err(ExpressionError::at(
                            format!("{} requires at least {}", f.name(), parametres(k)),
                            t.position,
                        ));
                    }
                    _ => {}
                }

                let paresse = fermee.paresse + usize::from(f.is_lazy());
                if paresse > MAX_LAZY_DEPTH {
                    return Err(ExpressionError::at(
                        "expression too deeply nested",
                        t.position,
                    ));
                }
                let englobante = courante(&mut portees, t)?;
                englobante.valeurs += 1;
                englobante.paresse = englobante.paresse.max(paresse);
            }
        }
    }

    if portees.len() > 1 {
        return Err(ExpressionError::new(
            "too many unhandled function parameter lists",
        ));
    }
    match portees.first().map_or(0, |p| p.valeurs) {
        0 => Err(ExpressionError::new("empty expression")),
        1 => Ok(()),
        _ => Err(ExpressionError::new("too many numbers or variables")),
    }
}

fn courante<'p>(portees: &'p mut [Portee], t: &RpnToken) -> Result<&'p mut Portee> {
    portees
        .last_mut()
        .ok_or_else(|| ExpressionError::at("empty expression", t.position))
}

fn parametres(k: usize) -> String {
    match k {
        1 => "one parameter".to_string(),
        2 => "two parameters".to_string(),
        _ => format!("{k} parameters"),
    }
}
