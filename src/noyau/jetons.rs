// src/noyau/jetons.rs
//
// Tokenisation : source -> suite de jetons classés, chacun avec sa position (en caractères).
//
// Règles:
// - nombres : chiffres, au plus un '.', exposant optionnel (e/E, signe, chiffres)
// - texte   : entre guillemets "..." (aucun échappement)
// - opérateurs : plus long symbole connu d'abord ("<=" avant "<")
// - identifiants : [A-Za-z][A-Za-z0-9]* (classés plus tard par le compilateur)
// - ( ) , : toujours un seul caractère, quelle que soit la table d'opérateurs

use std::fmt;

use super::erreur::{ExpressionError, Result};

/// Délimiteur des chaînes littérales.
pub const QUOTE: char = '"';

/// Séparateur décimal.
pub const DECIMAL: char = '.';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Str,
    Identifier,
    Operator,
    LeftParen,
    RightParen,
    Comma,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Texte du jeton (sans les guillemets pour une chaîne).
    pub surface: String,
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, surface: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            surface: surface.into(),
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Str => write!(f, "{QUOTE}{}{QUOTE}", self.surface),
            _ => f.write_str(&self.surface),
        }
    }
}

/// Tokenize `source` avec les symboles d'opérateurs actuellement connus.
pub fn tokenize<S: AsRef<str>>(source: &str, operateurs: &[S]) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = Vec::new();
    let mut i: usize = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Structure
        match c {
            '(' => {
                out.push(Token::new(TokenKind::LeftParen, "(", i));
                i += 1;
                continue;
            }
            ')' => {
                out.push(Token::new(TokenKind::RightParen, ")", i));
                i += 1;
                continue;
            }
            ',' => {
                out.push(Token::new(TokenKind::Comma, ",", i));
                i += 1;
                continue;
            }
            _ => {}
        }

        // Chaîne littérale
        if c == QUOTE {
            let start = i;
            i += 1;
            let debut = i;
            while i < chars.len() && chars[i] != QUOTE {
                i += 1;
            }
            if i >= chars.len() {
                return Err(ExpressionError::at("unterminated string", start));
            }
            let texte: String = chars[debut..i].iter().collect();
            out.push(Token::new(TokenKind::Str, texte, start));
            i += 1; // guillemet fermant
            continue;
        }

        // Nombre
        if let Some(fin) = scan_number(&chars, i) {
            let texte: String = chars[i..fin].iter().collect();
            out.push(Token::new(TokenKind::Number, texte, i));
            i = fin;
            continue;
        }

        // Identifiant
        if c.is_ascii_alphabetic() {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                i += 1;
            }
            let mot: String = chars[start..i].iter().collect();
            out.push(Token::new(TokenKind::Identifier, mot, start));
            continue;
        }

        // Opérateur : plus long symbole qui correspond
        if let Some(sym) = longest_operator(&chars[i..], operateurs) {
            let n = sym.chars().count();
            out.push(Token::new(TokenKind::Operator, sym, i));
            i += n;
            continue;
        }

        return Err(ExpressionError::at(format!("invalid character '{c}'"), i));
    }

    Ok(out)
}

/// Fin (exclue) du nombre qui commence en `start`, ou None si ce n'est pas un nombre.
fn scan_number(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start;
    let mut chiffres = 0usize;
    let mut decimal = false;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            chiffres += 1;
        } else if c == DECIMAL && !decimal {
            decimal = true;
        } else {
            break;
        }
        i += 1;
    }

    // "." seul, ou rien du tout : pas un nombre
    if chiffres == 0 {
        return None;
    }

    // Exposant : consommé seulement s'il est suivi de chiffres
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        let debut_exp = j;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        if j > debut_exp {
            i = j;
        }
    }

    Some(i)
}

fn longest_operator<S: AsRef<str>>(reste: &[char], operateurs: &[S]) -> Option<String> {
    operateurs
        .iter()
        .map(AsRef::as_ref)
        .filter(|sym| !sym.is_empty())
        .filter(|sym| {
            let n = sym.chars().count();
            n <= reste.len() && sym.chars().zip(reste.iter()).all(|(a, b)| a == *b)
        })
        .max_by_key(|sym| sym.chars().count())
        .map(str::to_string)
}

/// Format utilitaire (debug) : liste de jetons en texte.
pub fn format_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
