// src/noyau/registre.rs
//
// Tables nommées : opérateurs (unaires / binaires, précédence, associativité),
// fonctions (arité fixe ou variable, évaluation immédiate ou paresseuse) et variables.
//
// Contrats:
// - Le registre global est écrit UNE fois (au premier usage, ou via install_global) puis lu seulement.
// - Chaque Expression en garde une copie privée : ses ajouts ne fuient jamais ailleurs.
// - Noms de fonctions / variables insensibles à la casse (clé en majuscules).
//   Les symboles d'opérateurs sont comparés tels quels.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::arbre::Deferred;
use super::bibliotheque;
use super::erreur::Result;
use super::variant::Variant;

/* ------------------------ Opérateurs ------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

pub type UnaryRule = Arc<dyn Fn(&Variant) -> Result<Variant> + Send + Sync>;
pub type BinaryRule = Arc<dyn Fn(&Variant, &Variant) -> Result<Variant> + Send + Sync>;

#[derive(Clone)]
pub enum OperatorRule {
    Unary(UnaryRule),
    Binary(BinaryRule),
}

#[derive(Clone)]
pub struct Operator {
    symbol: String,
    precedence: i32,
    associativity: Associativity,
    boolean: bool,
    rule: OperatorRule,
}

impl Operator {
    pub fn binary<F>(symbol: &str, precedence: i32, associativity: Associativity, rule: F) -> Self
    where
        F: Fn(&Variant, &Variant) -> Result<Variant> + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.to_string(),
            precedence,
            associativity,
            boolean: false,
            rule: OperatorRule::Binary(Arc::new(rule)),
        }
    }

    /// Opérateur préfixe (ex: `!`).
    pub fn unary<F>(symbol: &str, precedence: i32, rule: F) -> Self
    where
        F: Fn(&Variant) -> Result<Variant> + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.to_string(),
            precedence,
            associativity: Associativity::Right,
            boolean: false,
            rule: OperatorRule::Unary(Arc::new(rule)),
        }
    }

    /// Marque l'opérateur comme produisant un booléen.
    pub fn boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn precedence(&self) -> i32 {
        self.precedence
    }

    pub fn associativity(&self) -> Associativity {
        self.associativity
    }

    pub fn is_left_associative(&self) -> bool {
        self.associativity == Associativity::Left
    }

    pub fn is_unary(&self) -> bool {
        matches!(self.rule, OperatorRule::Unary(_))
    }

    pub fn is_boolean(&self) -> bool {
        self.boolean
    }

    /// Nombre d'opérandes consommées.
    pub fn operands(&self) -> usize {
        if self.is_unary() {
            1
        } else {
            2
        }
    }

    pub fn rule(&self) -> &OperatorRule {
        &self.rule
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("symbol", &self.symbol)
            .field("precedence", &self.precedence)
            .field("associativity", &self.associativity)
            .field("unary", &self.is_unary())
            .finish()
    }
}

/* ------------------------ Fonctions ------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    /// Arité variable, avec un minimum propre à la fonction.
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

pub type EagerRule = Arc<dyn Fn(&[Variant]) -> Result<Variant> + Send + Sync>;
pub type LazyRule = Arc<dyn for<'a> Fn(&[Deferred<'a>]) -> Result<Variant> + Send + Sync>;

#[derive(Clone)]
pub enum FunctionRule {
    /// Reçoit les arguments déjà évalués.
    Eager(EagerRule),
    /// Reçoit les arguments NON évalués et décide lesquels forcer.
    Lazy(LazyRule),
}

#[derive(Clone)]
pub struct Function {
    name: String,
    arity: Arity,
    boolean: bool,
    rule: FunctionRule,
}

impl Function {
    pub fn eager<F>(name: &str, arity: Arity, rule: F) -> Self
    where
        F: Fn(&[Variant]) -> Result<Variant> + Send + Sync + 'static,
    {
        Self {
            name: name.to_ascii_uppercase(),
            arity,
            boolean: false,
            rule: FunctionRule::Eager(Arc::new(rule)),
        }
    }

    pub fn lazy<F>(name: &str, arity: Arity, rule: F) -> Self
    where
        F: for<'a> Fn(&[Deferred<'a>]) -> Result<Variant> + Send + Sync + 'static,
    {
        Self {
            name: name.to_ascii_uppercase(),
            arity,
            boolean: false,
            rule: FunctionRule::Lazy(Arc::new(rule)),
        }
    }

    /// Marque la fonction comme produisant un booléen.
    pub fn boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    /// Nom normalisé (majuscules).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.rule, FunctionRule::Lazy(_))
    }

    pub fn is_boolean(&self) -> bool {
        self.boolean
    }

    pub fn rule(&self) -> &FunctionRule {
        &self.rule
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("lazy", &self.is_lazy())
            .finish()
    }
}

/* ------------------------ Registre ------------------------ */

/// Clé normalisée d'un identifiant.
pub fn key(name: &str) -> String {
    name.to_ascii_uppercase()
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    operators: HashMap<String, Arc<Operator>>,
    functions: HashMap<String, Arc<Function>>,
    variables: HashMap<String, Variant>,
}

impl Registry {
    /// Registre vide (aucun opérateur, aucune fonction, aucune constante).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registre pré-rempli avec la bibliothèque standard.
    pub fn standard() -> Self {
        let mut r = Self::empty();
        bibliotheque::install(&mut r);
        r
    }

    /// Ajoute (ou remplace) un opérateur.
    pub fn add_operator(&mut self, op: Operator) {
        self.operators.insert(op.symbol.clone(), Arc::new(op));
    }

    /// Ajoute (ou remplace) une fonction.
    pub fn add_function(&mut self, f: Function) {
        self.functions.insert(f.name.clone(), Arc::new(f));
    }

    pub fn set_variable(&mut self, name: &str, value: Variant) {
        self.variables.insert(key(name), value);
    }

    pub fn operator(&self, symbol: &str) -> Option<&Arc<Operator>> {
        self.operators.get(symbol)
    }

    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions.get(&key(name))
    }

    pub fn variable(&self, name: &str) -> Option<&Variant> {
        self.variables.get(&key(name))
    }

    pub fn variables(&self) -> &HashMap<String, Variant> {
        &self.variables
    }

    /// Symboles d'opérateurs, du plus long au plus court (ordre stable).
    pub fn operator_symbols(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        v.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        v
    }

    pub fn declared_operators(&self) -> Vec<String> {
        sorted_keys(&self.operators)
    }

    pub fn declared_functions(&self) -> Vec<String> {
        sorted_keys(&self.functions)
    }

    pub fn declared_variables(&self) -> Vec<String> {
        sorted_keys(&self.variables)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut v: Vec<String> = map.keys().cloned().collect();
    v.sort();
    v
}

/* ------------------------ Registre global (écrit une fois) ------------------------ */

static GLOBAL: OnceCell<Registry> = OnceCell::new();

/// Registre global ; initialisé avec la bibliothèque standard au premier accès.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::standard)
}

/// Installe un registre global personnalisé. Échoue (et rend le registre)
/// si le global a déjà été initialisé ou lu.
pub fn install_global(registry: Registry) -> std::result::Result<(), Registry> {
    GLOBAL.set(registry)
}
