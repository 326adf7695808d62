// src/noyau/variant.rs
//
// Valeur dynamique qui circule dans le moteur : Nombre (f32) / Texte / Booléen.
//
// Règles de coercition :
// - as_number : booléen -> 1.0 / 0.0 ; texte -> parse f32 (sinon erreur de type)
// - as_string : nombre sans partie fractionnaire -> entier ("7"), sinon décimal ("1.5")
// - compare_to : lexical dès qu'un des deux côtés est du texte, numérique sinon ;
//   NaN n'est ordonné avec rien (None)

use std::cmp::Ordering;
use std::fmt;

use num_traits::ToPrimitive;

use super::erreur::{ExpressionError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Number(f32),
    String(String),
    Boolean(bool),
}

/// Singletons booléens partagés par tous les opérateurs / fonctions.
pub const TRUE: Variant = Variant::Boolean(true);
pub const FALSE: Variant = Variant::Boolean(false);

impl Variant {
    pub fn from_bool(b: bool) -> Variant {
        if b {
            TRUE
        } else {
            FALSE
        }
    }

    pub fn as_number(&self) -> Result<f32> {
        match self {
            Variant::Number(n) => Ok(*n),
            Variant::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Variant::String(s) => parse_number(s)
                .ok_or_else(|| ExpressionError::new(format!("cannot convert \"{s}\" to a number"))),
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Variant::Number(n) => format_number(*n),
            Variant::String(s) => s.clone(),
            Variant::Boolean(b) => b.to_string(),
        }
    }

    /// Jamais en échec : un texte est vrai s'il vaut "true" ou un nombre non nul.
    pub fn as_boolean(&self) -> bool {
        match self {
            Variant::Boolean(b) => *b,
            Variant::Number(n) => *n != 0.0,
            Variant::String(s) => {
                s.trim().eq_ignore_ascii_case("true") || parse_number(s).is_some_and(|n| n != 0.0)
            }
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Variant::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Variant::String(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Variant::Boolean(_))
    }

    /// Ordre de deux valeurs ; `None` si elles ne sont pas ordonnées (NaN).
    pub fn compare_to(&self, other: &Variant) -> Option<Ordering> {
        if self.is_string() || other.is_string() {
            return Some(self.as_string().cmp(&other.as_string()));
        }
        let a = self.as_number().ok()?;
        let b = other.as_number().ok()?;
        a.partial_cmp(&b)
    }

    /// Addition générique utilisée par `+`.
    pub fn add(&self, other: &Variant) -> Result<Variant> {
        Ok(Variant::Number(self.as_number()? + other.as_number()?))
    }
}

/// Texte -> f32 (espaces tolérés autour).
pub fn parse_number(s: &str) -> Option<f32> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f32>().ok().filter(|n| n.is_finite())
}

/// Entier si pas de partie fractionnaire, décimal sinon.
pub fn format_number(n: f32) -> String {
    if n.fract() == 0.0 {
        if let Some(i) = n.to_i64() {
            return i.to_string();
        }
    }
    n.to_string()
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::String(s) => f.write_str(s),
            other => f.write_str(&other.as_string()),
        }
    }
}

impl From<f32> for Variant {
    fn from(n: f32) -> Self {
        Variant::Number(n)
    }
}

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Variant::from_bool(b)
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Variant::String(s.to_string())
    }
}

impl From<String> for Variant {
    fn from(s: String) -> Self {
        Variant::String(s)
    }
}
