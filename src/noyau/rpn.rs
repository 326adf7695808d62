// src/noyau/rpn.rs
//
// Shunting-yard : jetons -> RPN (postfix), chaque jeton résolu UNE fois en Symbol.
//
// Règles:
// - nombre / texte / variable connue : sortie directe
// - nom de fonction suivi de '(' : empilé (sortira après sa parenthèse fermante)
// - nom de fonction sans '(' (et non lié comme variable) : erreur
// - autre identifiant : empilé tel quel (résolu plus tard, à l'évaluation)
// - ',' : dépile jusqu'à '('
// - opérateur binaire : dépile tant que le sommet est plus prioritaire (ou égal et associatif à gauche)
// - opérateur unaire préfixe : empilé sans rien dépiler
// - '(' après une fonction : marqueur d'appel émis en sortie (début des arguments)
// - ')' : dépile jusqu'à '(' ; si une fonction est alors au sommet, elle sort aussi
//
// NOTE: pas de moins unaire. "-1" produit un opérateur '-' sans opérande gauche.

use std::fmt;
use std::sync::Arc;

use super::erreur::{ExpressionError, Result};
use super::jetons::{Token, TokenKind, QUOTE};
use super::registre::{key, Function, Operator, Registry};
use super::variant::parse_number;

/// Jeton résolu.
#[derive(Clone, Debug)]
pub enum Symbol {
    Number(f32),
    Str(String),
    /// Variable connue à la compilation (clé normalisée).
    Variable(String),
    /// Identifiant inconnu à la compilation, résolu à l'évaluation.
    Unresolved(String),
    Operator(Arc<Operator>),
    Function(Arc<Function>),
    /// Début de la liste d'arguments d'un appel.
    CallStart,
}

#[derive(Clone, Debug)]
pub struct RpnToken {
    pub symbol: Symbol,
    pub surface: String,
    pub position: usize,
}

impl RpnToken {
    fn new(symbol: Symbol, tok: &Token) -> Self {
        Self {
            symbol,
            surface: tok.surface.clone(),
            position: tok.position,
        }
    }
}

impl fmt::Display for RpnToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Symbol::Str(s) => write!(f, "{QUOTE}{s}{QUOTE}"),
            Symbol::CallStart => f.write_str("("),
            Symbol::Function(func) => f.write_str(func.name()),
            _ => f.write_str(&self.surface),
        }
    }
}

/// Élément de la pile d'opérateurs.
enum Pile {
    Operator(Arc<Operator>, Token),
    Function(Arc<Function>, Token),
    Identifier(Token),
    Paren(Token),
}

/// Déplace un élément de pile vers la sortie ('(' n'a rien à faire en sortie).
fn sortie(p: Pile, out: &mut Vec<RpnToken>) -> Result<()> {
    let t = match p {
        Pile::Operator(op, tok) => RpnToken::new(Symbol::Operator(op), &tok),
        Pile::Function(f, tok) => RpnToken::new(Symbol::Function(f), &tok),
        Pile::Identifier(tok) => RpnToken::new(Symbol::Unresolved(tok.surface.clone()), &tok),
        Pile::Paren(tok) => {
            return Err(ExpressionError::at("mismatched parentheses", tok.position));
        }
    };
    out.push(t);
    Ok(())
}

/// Convertit une suite de jetons en RPN.
///
/// Exemple:
///   jetons: MAX ( 1 , 2 * x )
///   rpn:    ( 1 2 x * MAX
pub fn shunting_yard(tokens: &[Token], registry: &Registry) -> Result<Vec<RpnToken>> {
    let mut out: Vec<RpnToken> = Vec::with_capacity(tokens.len());
    let mut pile: Vec<Pile> = Vec::new();

    let mut precedent: Option<TokenKind> = None;
    // vrai si le jeton précédent a été résolu comme nom de fonction
    let mut apres_fonction = false;
    let mut fonction_courante: Option<String> = None;

    for (idx, tok) in tokens.iter().enumerate() {
        let mut est_fonction = false;

        match tok.kind {
            TokenKind::Number => {
                let n = parse_number(&tok.surface).ok_or_else(|| {
                    ExpressionError::at(format!("invalid number: {}", tok.surface), tok.position)
                })?;
                out.push(RpnToken::new(Symbol::Number(n), tok));
            }

            TokenKind::Str => {
                out.push(RpnToken::new(Symbol::Str(tok.surface.clone()), tok));
            }

            TokenKind::Identifier => {
                let appel = tokens
                    .get(idx + 1)
                    .is_some_and(|t| t.kind == TokenKind::LeftParen);
                let fonction = registry.function(&tok.surface);
                let variable = registry.variable(&tok.surface).is_some();

                match fonction {
                    Some(f) if appel => {
                        fonction_courante = Some(f.name().to_string());
                        pile.push(Pile::Function(Arc::clone(f), tok.clone()));
                        est_fonction = true;
                    }
                    _ if variable => {
                        out.push(RpnToken::new(Symbol::Variable(key(&tok.surface)), tok));
                    }
                    // fonction sans liste d'arguments : "(RANDOM)", "MAX + 1"
                    Some(f) => {
                        return Err(ExpressionError::at(
                            format!("missing parameter(s) for function {}", f.name()),
                            tok.position,
                        ));
                    }
                    None => pile.push(Pile::Identifier(tok.clone())),
                }
            }

            TokenKind::Comma => {
                if matches!(precedent, Some(TokenKind::Comma | TokenKind::LeftParen)) {
                    return Err(argument_manquant(&fonction_courante, tok.position));
                }
                loop {
                    match pile.pop() {
                        Some(Pile::Paren(p)) => {
                            pile.push(Pile::Paren(p));
                            break;
                        }
                        Some(autre) => sortie(autre, &mut out)?,
                        None => return Err(argument_manquant(&fonction_courante, tok.position)),
                    }
                }
            }

            TokenKind::Operator => {
                let op = registry.operator(&tok.surface).cloned().ok_or_else(|| {
                    ExpressionError::at(
                        format!("unknown operator or function: {}", tok.surface),
                        tok.position,
                    )
                })?;

                if !op.is_unary() {
                    if matches!(precedent, Some(TokenKind::Comma | TokenKind::LeftParen)) {
                        return Err(ExpressionError::at(
                            format!("missing parameter(s) for operator {}", op.symbol()),
                            tok.position,
                        ));
                    }

                    while let Some(Pile::Operator(sommet, _)) = pile.last() {
                        let doit_sortir = sommet.precedence() > op.precedence()
                            || (sommet.precedence() == op.precedence() && op.is_left_associative());
                        if !doit_sortir {
                            break;
                        }
                        if let Some(p) = pile.pop() {
                            sortie(p, &mut out)?;
                        }
                    }
                }

                pile.push(Pile::Operator(op, tok.clone()));
            }

            TokenKind::LeftParen => {
                if apres_fonction {
                    out.push(RpnToken::new(Symbol::CallStart, tok));
                } else if matches!(
                    precedent,
                    Some(
                        TokenKind::Number
                            | TokenKind::Str
                            | TokenKind::Identifier
                            | TokenKind::RightParen
                    )
                ) {
                    return Err(ExpressionError::at("missing operator", tok.position));
                }
                pile.push(Pile::Paren(tok.clone()));
            }

            TokenKind::RightParen => {
                if precedent == Some(TokenKind::Comma) {
                    return Err(argument_manquant(&fonction_courante, tok.position));
                }
                loop {
                    match pile.pop() {
                        Some(Pile::Paren(_)) => break,
                        Some(autre) => sortie(autre, &mut out)?,
                        None => {
                            return Err(ExpressionError::at(
                                "mismatched parentheses",
                                tok.position,
                            ));
                        }
                    }
                }
                if matches!(pile.last(), Some(Pile::Function(..))) {
                    if let Some(f) = pile.pop() {
                        sortie(f, &mut out)?;
                    }
                }
            }
        }

        apres_fonction = est_fonction;
        precedent = Some(tok.kind);
    }

    // vide la pile
    while let Some(p) = pile.pop() {
        match p {
            Pile::Operator(..) => sortie(p, &mut out)?,
            Pile::Paren(tok) => {
                return Err(ExpressionError::at("mismatched parentheses", tok.position));
            }
            Pile::Function(_, tok) | Pile::Identifier(tok) => {
                return Err(ExpressionError::at(
                    format!("unknown operator or function: {}", tok.surface),
                    tok.position,
                ));
            }
        }
    }

    Ok(out)
}

fn argument_manquant(fonction: &Option<String>, position: usize) -> ExpressionError {
    let msg = match fonction {
        Some(f) => format!("missing parameter(s) for function {f}"),
        None => "missing parameter(s)".to_string(),
    };
    ExpressionError::at(msg, position)
}

/// RPN en texte (debug / to_rpn).
pub fn format_rpn(rpn: &[RpnToken]) -> String {
    rpn.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
