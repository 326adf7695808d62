// src/noyau/expression.rs
//
// Façade : une source texte + une copie privée du registre + caches (RPN, arbre).
//
// Cycle de vie :
//   new(texte) -> (1er accès RPN) tokenize + shunting-yard + validation
//              -> (1er eval) construction de l'arbre -> forcé à chaque eval()
//
// Invariants :
// - RPN et arbre sont invalidés ENSEMBLE quand la source change (substitution textuelle)
//   ou quand un opérateur / une fonction est ajouté.
// - Re-liaison numérique d'une variable : aucun cache invalidé (l'arbre relit la table).
// - Le cache de compilation global n'est qu'une optimisation : deux expressions de même
//   texte s'évaluent pareil, servies par le cache ou non.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::{NoExpand, Regex};

use super::arbre::EvalTree;
use super::bibliotheque::is_constant;
use super::erreur::Result;
use super::jetons::{tokenize, TokenKind};
use super::registre::{self, Function, Operator, Registry};
use super::rpn::{format_rpn, shunting_yard, RpnToken, Symbol};
use super::validation::validate;
use super::variant::{parse_number, Variant};

/// Valeur passée à `set_variable` : nombre, ou texte (nombre ou sous-expression).
#[derive(Clone, Debug, PartialEq)]
pub enum VariableValue {
    Number(f32),
    Text(String),
}

impl From<f32> for VariableValue {
    fn from(n: f32) -> Self {
        VariableValue::Number(n)
    }
}

impl From<f64> for VariableValue {
    fn from(n: f64) -> Self {
        VariableValue::Number(n as f32)
    }
}

impl From<i32> for VariableValue {
    fn from(n: i32) -> Self {
        VariableValue::Number(n as f32)
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        VariableValue::Text(s.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        VariableValue::Text(s)
    }
}

#[derive(Clone, Debug)]
pub struct Expression {
    original: String,
    source: String,
    registry: Registry,
    rpn: Option<Arc<[RpnToken]>>,
    tree: Option<Arc<EvalTree>>,
}

/// Cache global : source brute -> expression compilée (jetons + RPN + validation).
static COMPILE_CACHE: Lazy<Mutex<HashMap<String, Expression>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl Expression {
    /// Expression sur le registre global. Rien n'est tokenisé ici.
    pub fn new(text: &str) -> Self {
        Self::with_registry(text, registre::global())
    }

    /// Expression sur un registre fourni explicitement (copié).
    pub fn with_registry(text: &str, registry: &Registry) -> Self {
        Self {
            original: text.to_string(),
            source: text.to_string(),
            registry: registry.clone(),
            rpn: None,
            tree: None,
        }
    }

    /// Compilation partagée : rend une copie de l'expression déjà compilée pour ce texte,
    /// ou compile (tokenize + RPN + validation), met en cache et rend la nouvelle.
    pub fn compile(text: &str) -> Result<Expression> {
        if let Some(deja) = COMPILE_CACHE.lock().get(text) {
            debug!("compile cache hit: {text:?}");
            return Ok(deja.clone());
        }

        debug!("compile cache miss: {text:?}");
        let mut e = Expression::new(text);
        e.ensure_rpn()?;
        // le verrou n'est pas tenu pendant la compilation
        COMPILE_CACHE
            .lock()
            .entry(text.to_string())
            .or_insert_with(|| e.clone());
        Ok(e)
    }

    /// Vide le cache global de compilation.
    pub fn clear_compile_cache() {
        COMPILE_CACHE.lock().clear();
    }

    /// Lie une variable.
    ///
    /// - nombre (ou texte qui se lit comme un nombre) : re-liaison en place, caches conservés ;
    /// - autre texte : substitution mot entier, insensible à la casse, de `name` par `(texte)`
    ///   dans la source courante ; RPN et arbre invalidés.
    pub fn set_variable(&mut self, name: &str, value: impl Into<VariableValue>) -> &mut Self {
        match value.into() {
            VariableValue::Number(n) => self.set_variant(name, Variant::Number(n)),
            VariableValue::Text(t) => match parse_number(&t) {
                Some(n) => self.set_variant(name, Variant::Number(n)),
                None => {
                    if let Some(s) = substituer(&self.source, name, &t) {
                        debug!("substitution {name} -> ({t}) : recompilation de {s:?}");
                        self.source = s;
                    }
                    self.invalidate();
                    self
                }
            },
        }
    }

    /// Lie une variable à une valeur quelconque (texte, booléen...). Caches conservés.
    pub fn set_variant(&mut self, name: &str, value: Variant) -> &mut Self {
        self.registry.set_variable(name, value);
        self
    }

    /// Forme chaînable de `set_variable`.
    pub fn with(mut self, name: &str, value: impl Into<VariableValue>) -> Self {
        self.set_variable(name, value);
        self
    }

    /// Opérateur local à cette expression (masque un opérateur global de même symbole).
    pub fn add_operator(&mut self, op: Operator) -> &mut Self {
        self.registry.add_operator(op);
        self.invalidate();
        self
    }

    /// Fonction locale à cette expression (masque une fonction globale de même nom).
    pub fn add_function(&mut self, f: Function) -> &mut Self {
        self.registry.add_function(f);
        self.invalidate();
        self
    }

    /// Compile si besoin, construit l'arbre si besoin, puis l'évalue.
    pub fn eval(&mut self) -> Result<Variant> {
        let tree = self.ensure_tree()?;
        tree.evaluate(self.registry.variables())
    }

    /// RPN résolue (compilée au premier accès).
    pub fn rpn(&mut self) -> Result<Arc<[RpnToken]>> {
        self.ensure_rpn()
    }

    /// RPN en texte, ex: "1 2 3 * +".
    pub fn to_rpn(&mut self) -> Result<String> {
        Ok(format_rpn(&self.ensure_rpn()?))
    }

    /// Vrai si la dernière étape produit un booléen (opérateur / fonction booléens,
    /// ou variable liée à un booléen).
    pub fn is_boolean(&mut self) -> Result<bool> {
        let rpn = self.ensure_rpn()?;
        Ok(match rpn.last().map(|t| &t.symbol) {
            Some(Symbol::Operator(op)) => op.is_boolean(),
            Some(Symbol::Function(f)) => f.is_boolean(),
            Some(Symbol::Variable(k)) => self.registry.variable(k).is_some_and(Variant::is_boolean),
            _ => false,
        })
    }

    /// Identifiants utilisés comme variables (hors fonctions et constantes), dans l'ordre
    /// de première apparition. Ne compile pas.
    pub fn used_variables(&self) -> Result<Vec<String>> {
        let jetons = tokenize(&self.source, &self.registry.operator_symbols())?;
        let mut vus: Vec<String> = Vec::new();
        for (i, t) in jetons.iter().enumerate() {
            if t.kind != TokenKind::Identifier || is_constant(&t.surface) {
                continue;
            }
            let appel = jetons
                .get(i + 1)
                .is_some_and(|s| s.kind == TokenKind::LeftParen);
            if appel && self.registry.function(&t.surface).is_some() {
                continue;
            }
            if !vus.iter().any(|v| v.eq_ignore_ascii_case(&t.surface)) {
                vus.push(t.surface.clone());
            }
        }
        Ok(vus)
    }

    pub fn declared_variables(&self) -> Vec<String> {
        self.registry.declared_variables()
    }

    pub fn declared_operators(&self) -> Vec<String> {
        self.registry.declared_operators()
    }

    pub fn declared_functions(&self) -> Vec<String> {
        self.registry.declared_functions()
    }

    /// Texte d'origine (jamais modifié).
    pub fn original_source(&self) -> &str {
        &self.original
    }

    /// Texte courant (après substitutions).
    pub fn source(&self) -> &str {
        &self.source
    }

    fn invalidate(&mut self) {
        self.rpn = None;
        self.tree = None;
    }

    fn ensure_rpn(&mut self) -> Result<Arc<[RpnToken]>> {
        if let Some(rpn) = &self.rpn {
            return Ok(Arc::clone(rpn));
        }
        let jetons = tokenize(&self.source, &self.registry.operator_symbols())?;
        let rpn = shunting_yard(&jetons, &self.registry)?;
        validate(&rpn)?;
        trace!("rpn {:?} : {}", self.source, format_rpn(&rpn));

        let rpn: Arc<[RpnToken]> = rpn.into();
        self.rpn = Some(Arc::clone(&rpn));
        self.tree = None;
        Ok(rpn)
    }

    fn ensure_tree(&mut self) -> Result<Arc<EvalTree>> {
        if let Some(tree) = &self.tree {
            return Ok(Arc::clone(tree));
        }
        let rpn = self.ensure_rpn()?;
        let tree = Arc::new(EvalTree::build(&rpn)?);
        self.tree = Some(Arc::clone(&tree));
        Ok(tree)
    }
}

/// Remplace `name` (mot entier, insensible à la casse) par `(texte)`.
fn substituer(source: &str, name: &str, texte: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name))).ok()?;
    let remplacement = format!("({texte})");
    Some(re.replace_all(source, NoExpand(&remplacement)).into_owned())
}
