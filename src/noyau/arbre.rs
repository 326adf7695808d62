// src/noyau/arbre.rs
//
// RPN validée -> arbre d'évaluation différée (arène de noeuds) -> Variant.
//
// Les noeuds ne calculent rien à la construction : eval() force la racine.
// Évaluation ITÉRATIVE (pile de travail explicite) : une grosse expression ne fait pas
// exploser la pile native. Seules les fonctions paresseuses (IF...) ré-entrent,
// une fois par niveau d'imbrication paresseuse.
//
// Variables : lues dans la table au moment de l'évaluation (jamais copiées dans l'arbre),
// donc une re-liaison numérique après compilation est vue au prochain eval().

use std::collections::HashMap;
use std::sync::Arc;

use super::erreur::{ExpressionError, Result};
use super::registre::{key, Function, FunctionRule, Operator, OperatorRule};
use super::rpn::{RpnToken, Symbol};
use super::variant::Variant;

pub type NodeId = usize;

#[derive(Debug)]
enum Node {
    Constant(Variant),
    Variable {
        key: String,
        surface: String,
    },
    Unary {
        op: Arc<Operator>,
        operand: NodeId,
    },
    Binary {
        op: Arc<Operator>,
        left: NodeId,
        right: NodeId,
    },
    Call {
        function: Arc<Function>,
        args: Vec<NodeId>,
    },
}

#[derive(Debug)]
pub struct EvalTree {
    nodes: Vec<Node>,
    root: NodeId,
}

/// Valeur différée : un argument NON évalué passé à une fonction paresseuse.
#[derive(Clone, Copy)]
pub struct Deferred<'a> {
    tree: &'a EvalTree,
    node: NodeId,
    variables: &'a HashMap<String, Variant>,
}

impl Deferred<'_> {
    /// Force la valeur (rien n'est mémorisé : chaque appel ré-évalue).
    pub fn eval(&self) -> Result<Variant> {
        self.tree.force(self.node, self.variables)
    }
}

/// Élément de la pile de construction.
enum Item {
    Node(NodeId),
    /// Début des arguments d'un appel.
    Boundary,
}

/// Étape de la pile de travail.
enum Step {
    Visit(NodeId),
    Apply(NodeId),
}

impl EvalTree {
    /// Rejoue la RPN avec une pile de noeuds au lieu de valeurs.
    pub fn build(rpn: &[RpnToken]) -> Result<EvalTree> {
        let mut nodes: Vec<Node> = Vec::with_capacity(rpn.len());
        let mut pile: Vec<Item> = Vec::new();

        for t in rpn {
            match &t.symbol {
                Symbol::Number(n) => push(&mut nodes, &mut pile, Node::Constant(Variant::Number(*n))),
                Symbol::Str(s) => push(
                    &mut nodes,
                    &mut pile,
                    Node::Constant(Variant::String(s.clone())),
                ),
                Symbol::Variable(k) => push(
                    &mut nodes,
                    &mut pile,
                    Node::Variable {
                        key: k.clone(),
                        surface: t.surface.clone(),
                    },
                ),
                Symbol::Unresolved(name) => push(
                    &mut nodes,
                    &mut pile,
                    Node::Variable {
                        key: key(name),
                        surface: name.clone(),
                    },
                ),

                Symbol::Operator(op) => {
                    let manque = || {
                        ExpressionError::at(
                            format!("missing parameter(s) for operator {}", op.symbol()),
                            t.position,
                        )
                    };
                    let node = if op.is_unary() {
                        let operand = operande(&mut pile).ok_or_else(manque)?;
                        Node::Unary {
                            op: Arc::clone(op),
                            operand,
                        }
                    } else {
                        let right = operande(&mut pile).ok_or_else(manque)?;
                        let left = operande(&mut pile).ok_or_else(manque)?;
                        Node::Binary {
                            op: Arc::clone(op),
                            left,
                            right,
                        }
                    };
                    push(&mut nodes, &mut pile, node);
                }

                Symbol::CallStart => pile.push(Item::Boundary),

                Symbol::Function(f) => {
                    let mut args = Vec::new();
                    loop {
                        match pile.pop() {
                            Some(Item::Node(id)) => args.push(id),
                            Some(Item::Boundary) => break,
                            None => {
                                return Err(ExpressionError::at(
                                    format!("missing parameter list for function {}", f.name()),
                                    t.position,
                                ));
                            }
                        }
                    }
                    args.reverse();
                    push(
                        &mut nodes,
                        &mut pile,
                        Node::Call {
                            function: Arc::clone(f),
                            args,
                        },
                    );
                }
            }
        }

        match (pile.pop(), pile.is_empty()) {
            (Some(Item::Node(root)), true) => Ok(EvalTree { nodes, root }),
            (None, _) => Err(ExpressionError::new("empty expression")),
            _ => Err(ExpressionError::new("too many numbers or variables")),
        }
    }

    /// Nombre de noeuds.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn evaluate(&self, variables: &HashMap<String, Variant>) -> Result<Variant> {
        self.force(self.root, variables)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| ExpressionError::new(format!("invalid evaluation node {id}")))
    }

    fn force(&self, depart: NodeId, variables: &HashMap<String, Variant>) -> Result<Variant> {
        let mut travail: Vec<Step> = vec![Step::Visit(depart)];
        let mut valeurs: Vec<Variant> = Vec::new();

        while let Some(step) = travail.pop() {
            match step {
                Step::Visit(id) => match self.node(id)? {
                    Node::Constant(v) => valeurs.push(v.clone()),

                    Node::Variable { key, surface } => {
                        let v = variables.get(key).cloned().ok_or_else(|| {
                            ExpressionError::new(format!("unknown operator or function: {surface}"))
                        })?;
                        valeurs.push(v);
                    }

                    Node::Unary { operand, .. } => {
                        travail.push(Step::Apply(id));
                        travail.push(Step::Visit(*operand));
                    }

                    // gauche évaluée avant droite
                    Node::Binary { left, right, .. } => {
                        travail.push(Step::Apply(id));
                        travail.push(Step::Visit(*right));
                        travail.push(Step::Visit(*left));
                    }

                    Node::Call { function, args } => match function.rule() {
                        FunctionRule::Lazy(rule) => {
                            let differes: Vec<Deferred<'_>> = args
                                .iter()
                                .map(|&node| Deferred {
                                    tree: self,
                                    node,
                                    variables,
                                })
                                .collect();
                            valeurs.push(rule(&differes[..])?);
                        }
                        FunctionRule::Eager(_) => {
                            travail.push(Step::Apply(id));
                            travail.extend(args.iter().rev().map(|&a| Step::Visit(a)));
                        }
                    },
                },

                Step::Apply(id) => match self.node(id)? {
                    Node::Unary { op, .. } => {
                        let a = depile(&mut valeurs)?;
                        match op.rule() {
                            OperatorRule::Unary(rule) => valeurs.push(rule(&a)?),
                            OperatorRule::Binary(_) => return Err(mauvaise_arite(op)),
                        }
                    }
                    Node::Binary { op, .. } => {
                        let b = depile(&mut valeurs)?;
                        let a = depile(&mut valeurs)?;
                        match op.rule() {
                            OperatorRule::Binary(rule) => valeurs.push(rule(&a, &b)?),
                            OperatorRule::Unary(_) => return Err(mauvaise_arite(op)),
                        }
                    }
                    Node::Call { function, args } => {
                        if valeurs.len() < args.len() {
                            return Err(ExpressionError::new(format!(
                                "missing parameter(s) for function {}",
                                function.name()
                            )));
                        }
                        let a = valeurs.split_off(valeurs.len() - args.len());
                        if let FunctionRule::Eager(rule) = function.rule() {
                            valeurs.push(rule(&a[..])?);
                        }
                    }
                    Node::Constant(_) | Node::Variable { .. } => {
                        return Err(ExpressionError::new(format!(
                            "invalid evaluation node {id}"
                        )));
                    }
                },
            }
        }

        match (valeurs.pop(), valeurs.is_empty()) {
            (Some(v), true) => Ok(v),
            _ => Err(ExpressionError::new("too many numbers or variables")),
        }
    }
}

fn push(nodes: &mut Vec<Node>, pile: &mut Vec<Item>, n: Node) {
    nodes.push(n);
    pile.push(Item::Node(nodes.len() - 1));
}

fn operande(pile: &mut Vec<Item>) -> Option<NodeId> {
    match pile.pop() {
        Some(Item::Node(id)) => Some(id),
        Some(Item::Boundary) => {
            pile.push(Item::Boundary);
            None
        }
        None => None,
    }
}

fn depile(valeurs: &mut Vec<Variant>) -> Result<Variant> {
    valeurs
        .pop()
        .ok_or_else(|| ExpressionError::new("missing operand"))
}

fn mauvaise_arite(op: &Operator) -> ExpressionError {
    ExpressionError::new(format!("operator {} applied with wrong arity", op.symbol()))
}
