//! Tests de propriétés : précédence, associativité, court-circuit, validation,
//! variables vivantes, substitution textuelle, cache de compilation.
//!
//! Chaque test part d'un texte source et passe par la façade publique (Expression).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::erreur::ExpressionError;
use super::registre::{Arity, Function};
use super::variant::Variant;
use super::Expression;

fn eval_ok(expr: &str) -> Variant {
    Expression::new(expr)
        .eval()
        .unwrap_or_else(|e| panic!("expr={expr:?} err={e}"))
}

fn assert_num(expr: &str, attendu: f32) {
    match eval_ok(expr) {
        Variant::Number(n) => assert!(
            (n - attendu).abs() <= 1e-4 * attendu.abs().max(1.0),
            "expr={expr:?} : {n} != {attendu}"
        ),
        autre => panic!("expr={expr:?} : attendu un nombre, obtenu {autre:?}"),
    }
}

fn compile_err(expr: &str) -> String {
    match Expression::compile(expr) {
        Ok(mut e) => panic!(
            "expr={expr:?} : compilation acceptée, rpn={:?}",
            e.to_rpn()
        ),
        Err(e) => e.to_string(),
    }
}

/* ------------------------ Précédence / associativité ------------------------ */

#[test]
fn prop_precedence() {
    assert_num("1+2*3", 7.0);
    assert_num("(1+2)*3", 9.0);
    assert_num("10 - 4 / 2", 8.0);
    assert_num("2 * 3 % 4", 2.0);
}

#[test]
fn prop_associativite_gauche() {
    assert_num("2-3-4", -5.0);
    assert_num("64/4/2", 8.0);
}

#[test]
fn prop_comparaisons_non_chainees() {
    // (1<2)<3 -> vrai(=1) < 3 -> vrai
    assert_eq!(eval_ok("1<2<3"), Variant::Boolean(true));
    // (3>2)>1 -> vrai(=1) > 1 -> faux
    assert_eq!(eval_ok("3>2>1"), Variant::Boolean(false));
    // le booléen vaut 1.0 en comparaison numérique
    assert_eq!(eval_ok("(1<2) = 1"), Variant::Boolean(true));
}

#[test]
fn prop_comparaisons_nan() {
    // NaN n'est ni égal, ni inférieur, ni supérieur à quoi que ce soit
    for expr in [
        "(0/0) = (0/0)",
        "(0/0) == 1",
        "(0/0) > 1",
        "(0/0) >= 1",
        "1 < (0/0)",
        "(0/0) <= 1",
    ] {
        assert_eq!(eval_ok(expr), Variant::Boolean(false), "expr={expr:?}");
    }
    assert_eq!(eval_ok("(0/0) != (0/0)"), Variant::Boolean(true));
    assert_eq!(eval_ok("(0/0) <> 1"), Variant::Boolean(true));
    assert_eq!(eval_ok("ONEOF(0/0, 1, 0/0)"), Variant::Boolean(false));
}

#[test]
fn prop_booleens() {
    assert_eq!(eval_ok("1 < 2 && 2 < 1"), Variant::Boolean(false));
    assert_eq!(eval_ok("1 < 2 || 2 < 1"), Variant::Boolean(true));
    assert_eq!(eval_ok("!(1 == 1)"), Variant::Boolean(false));
    assert_eq!(eval_ok("NOT(FALSE)"), Variant::Boolean(true));
    assert_eq!(eval_ok("1 != 2"), Variant::Boolean(true));
    assert_eq!(eval_ok("\"a\" == \"a\""), Variant::Boolean(true));
}

#[test]
fn prop_bibliotheque_de_base() {
    assert_num("SIN(30)", 0.5);
    assert_num("COS(60) + TAN(45)", 1.5);
    assert_num("MAX(1, 9, 4) - MIN(3, 0 - 2)", 11.0);
    assert_num("CLAMP(15, 0, 10)", 10.0);
    assert_num("ROUND(2.4) + FLOOR(2.9) + CEILING(2.1)", 7.0);
    assert_num("SQRT(16) + ABS(0 - 3)", 7.0);
    assert_num("PI", std::f32::consts::PI);
    assert_num("e", std::f32::consts::E);
    assert_num("2^10", 1024.0);
    assert_num("1.5e2 + .5", 150.5);
    assert_eq!(eval_ok("ONEOF(3, 1, 2, 3)"), Variant::Boolean(true));
    assert_eq!(eval_ok("MATCH(\"[0-9]+\", \"2024\")"), Variant::Boolean(true));
}

/* ------------------------ Court-circuit ------------------------ */

#[test]
fn prop_court_circuit_if() {
    let appels = Arc::new(AtomicUsize::new(0));
    let compteur = Arc::clone(&appels);

    let mut e = Expression::new("IF(TRUE, 1, BOOM())");
    e.add_function(Function::eager("BOOM", Arity::Exactly(0), move |_| {
        compteur.fetch_add(1, Ordering::SeqCst);
        Err(ExpressionError::new("BOOM must never be called"))
    }));

    assert_eq!(e.eval().unwrap(), Variant::Number(1.0));
    assert_eq!(appels.load(Ordering::SeqCst), 0);
}

/* ------------------------ Validation ------------------------ */

#[test]
fn prop_arite_avant_evaluation() {
    let e = compile_err("MAX()");
    assert!(e.contains("MAX requires at least one parameter"), "{e}");
    let e = compile_err("CLAMP(1, 2)");
    assert!(e.contains("function CLAMP expected 3 parameters, got 2"), "{e}");
}

#[test]
fn prop_equilibre() {
    assert!(compile_err("1 +").contains("missing parameter(s) for operator +"));
    assert!(compile_err("(1+2").contains("mismatched parentheses"));
    assert!(compile_err("1+2)").contains("mismatched parentheses"));
    assert!(compile_err("1 2").contains("too many numbers or variables"));
    assert!(compile_err("").contains("empty expression"));
    assert!(compile_err("nope + 1").contains("unknown operator or function: nope"));
    assert!(compile_err("2 (3)").contains("missing operator at position 2"));
}

#[test]
fn prop_pas_de_moins_unaire() {
    assert!(compile_err("-1").contains("missing parameter(s) for operator -"));
    assert_num("0-1", -1.0);
}

#[test]
fn prop_erreur_de_type_a_l_evaluation() {
    // compile sans erreur, échoue seulement quand le texte est forcé comme nombre
    let mut e = Expression::compile("\"abc\" * 2").unwrap();
    let err = e.eval().unwrap_err();
    assert!(err.message().contains("cannot convert \"abc\" to a number"));

    // branche non prise : jamais convertie
    assert_num("IF(FALSE, \"abc\" * 2, 5)", 5.0);
}

/* ------------------------ Variables ------------------------ */

#[test]
fn prop_reliaison_vivante() {
    let mut e = Expression::new("x+1");
    e.set_variable("x", 5.0);
    assert_eq!(e.eval().unwrap(), Variant::Number(6.0));

    let avant = e.rpn().unwrap();
    e.set_variable("x", 10.0);
    assert_eq!(e.eval().unwrap(), Variant::Number(11.0));
    // même RPN (pas de recompilation)
    assert!(Arc::ptr_eq(&avant, &e.rpn().unwrap()));
}

#[test]
fn prop_substitution_recompile() {
    let mut e = Expression::new("x+1");
    e.set_variable("x", 5.0);
    let avant = e.to_rpn().unwrap();
    assert_eq!(avant, "x 1 +");

    e.set_variable("x", "y*2");
    e.set_variable("y", 3.0);
    assert_eq!(e.eval().unwrap(), Variant::Number(7.0));

    let apres = e.to_rpn().unwrap();
    assert_ne!(avant, apres);
    assert_eq!(apres, "y 2 * 1 +");
}

#[test]
fn prop_variables_insensibles_a_la_casse() {
    let mut e = Expression::new("Vitesse * 2");
    e.set_variable("VITESSE", 4.0);
    assert_eq!(e.eval().unwrap(), Variant::Number(8.0));
}

/* ------------------------ Cache de compilation ------------------------ */

#[test]
fn prop_cache_de_compilation() {
    // `a` inconnue au moment de compile() : erreur, jamais mise en cache
    assert!(Expression::compile("a + 0").is_err());
    assert!(Expression::compile("a + 0").is_err());

    let src = "MAX(2, 7) * 3 - ROUND(1.6)";
    let mut a = Expression::compile(src).unwrap();
    let mut b = Expression::compile(src).unwrap();
    assert_eq!(a.eval().unwrap(), b.eval().unwrap());
    assert_eq!(a.eval().unwrap(), Variant::Number(19.0));

    // même résultat avec ou sans cache
    Expression::clear_compile_cache();
    let mut c = Expression::compile(src).unwrap();
    assert_eq!(c.eval().unwrap(), Variant::Number(19.0));

    // une copie servie par le cache reste indépendante
    let mut d = Expression::compile("PI * 2").unwrap();
    d.set_variable("PI", 1.0);
    assert_eq!(d.eval().unwrap(), Variant::Number(2.0));
    let mut f = Expression::compile("PI * 2").unwrap();
    assert_num("PI * 2", std::f32::consts::PI * 2.0);
    assert_eq!(f.eval().unwrap(), Variant::Number(std::f32::consts::PI * 2.0));
}

#[test]
fn prop_rpn_reproductible() {
    for src in [
        "1+2*3",
        "IF(1 > 2, \"a\", \"b\")",
        "MAX(1, MIN(2, 3), 4) ^ 2",
        "!(1 <= 2) || 3 <> 4 && 5 >= 6",
    ] {
        let r1 = Expression::compile(src).unwrap().to_rpn().unwrap();
        Expression::clear_compile_cache();
        let r2 = Expression::compile(src).unwrap().to_rpn().unwrap();
        let r3 = Expression::new(src).to_rpn().unwrap();
        assert_eq!(r1, r2, "src={src:?}");
        assert_eq!(r1, r3, "src={src:?}");
    }
}

/* ------------------------ Concurrence ------------------------ */

#[test]
fn prop_instances_independantes_entre_threads() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let mut e = Expression::new("CLAMP(n * 2, 0, 10)");
                e.set_variable("n", i as f32);
                e.eval().map(|v| v.as_number().unwrap_or(f32::NAN))
            })
        })
        .collect();

    for (i, h) in handles.into_iter().enumerate() {
        let v = h.join().expect("thread").expect("eval");
        assert_eq!(v, ((i * 2) as f32).min(10.0));
    }
}

#[test]
fn prop_compilation_partagee_entre_threads() {
    // même texte compilé en parallèle : cache partagé, résultats identiques
    let src = "MAX(1, 2) + 3 * CLAMP(k, 0, 4)";
    let handles: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(move || {
                let mut e = Expression::compile(src)?;
                let rpn = e.to_rpn()?;
                e.set_variable("k", 10.0);
                Ok::<_, ExpressionError>((rpn, e.eval()?))
            })
        })
        .collect();

    for h in handles {
        let (rpn, v) = h.join().expect("thread").expect("compile + eval");
        assert_eq!(rpn, "( 1 2 MAX 3 ( k 0 4 CLAMP * +");
        assert_eq!(v, Variant::Number(14.0));
    }
}

/* ------------------------ Limites ------------------------ */

#[test]
fn prop_si_imbriques_sans_debordement() {
    let si = |n: usize| format!("{}1{}", "IF(TRUE, ".repeat(n), ", 0)".repeat(n));

    assert_num(&si(100), 1.0);

    for n in [500, 3_000] {
        let err = Expression::new(&si(n)).eval().unwrap_err();
        assert_eq!(err.message(), "expression too deeply nested", "n={n}");
        assert!(Expression::compile(&si(n)).is_err(), "n={n}");
    }
}
