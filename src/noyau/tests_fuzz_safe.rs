//! Tests fuzz safe : robustesse + déterminisme + limites contrôlées.
//!
//! But : marteler le pipeline sans brûler la machine.
//! - RNG déterministe (seed fixe)
//! - profondeur bornée
//! - budget temps global
//! - invariant clé : une expression générée valide compile, et sa RPN est reproductible
//! - du bruit arbitraire ne fait JAMAIS paniquer (erreur propre ou résultat)

use std::time::{Duration, Instant};

use super::variant::Variant;
use super::Expression;

/* ------------------------ RNG déterministe minimal ------------------------ */

#[derive(Clone)]
struct Rng {
    state: u64,
}
impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }
    fn next_u32(&mut self) -> u32 {
        // LCG simple (déterministe)
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }
    fn pick(&mut self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.next_u32() % n
        }
    }
    fn coin(&mut self) -> bool {
        (self.next_u32() & 1) == 1
    }
}

/* ------------------------ Budget anti-gel ------------------------ */

fn budget(start: Instant, max: Duration) {
    if start.elapsed() > max {
        panic!("budget temps dépassé: {:?}", max);
    }
}

/* ------------------------ Génération d’expressions (bornée) ------------------------ */

const OPS_ARITH: [&str; 5] = ["+", "-", "*", "/", "%"];
const OPS_CMP: [&str; 8] = [">", ">=", "<", "<=", "=", "==", "!=", "<>"];

fn gen_atom(rng: &mut Rng) -> String {
    match rng.pick(6) {
        0 => format!("{}", rng.pick(100)),
        1 => format!("{}.{}", rng.pick(10), rng.pick(100)),
        2 => "x".to_string(),
        3 => "y".to_string(),
        4 => "PI".to_string(),
        _ => {
            if rng.coin() {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
    }
}

fn gen_expr(rng: &mut Rng, depth: usize) -> String {
    if depth == 0 {
        return gen_atom(rng);
    }

    match rng.pick(10) {
        0 => gen_atom(rng),
        1 | 2 => {
            let op = OPS_ARITH[rng.pick(OPS_ARITH.len() as u32) as usize];
            format!(
                "({} {op} {})",
                gen_expr(rng, depth - 1),
                gen_expr(rng, depth - 1)
            )
        }
        3 => {
            let op = OPS_CMP[rng.pick(OPS_CMP.len() as u32) as usize];
            format!("{} {op} {}", gen_expr(rng, depth - 1), gen_expr(rng, depth - 1))
        }
        4 => format!(
            "IF({}, {}, {})",
            gen_expr(rng, depth - 1),
            gen_expr(rng, depth - 1),
            gen_expr(rng, depth - 1)
        ),
        5 => {
            let n = 1 + rng.pick(4) as usize;
            let args: Vec<String> = (0..n).map(|_| gen_expr(rng, depth - 1)).collect();
            let f = if rng.coin() { "MAX" } else { "MIN" };
            format!("{f}({})", args.join(", "))
        }
        6 => format!(
            "CLAMP({}, 0, 100)",
            gen_expr(rng, depth - 1)
        ),
        7 => format!("!({})", gen_expr(rng, depth - 1)),
        8 => format!(
            "{} && {}",
            gen_expr(rng, depth - 1),
            gen_expr(rng, depth - 1)
        ),
        _ => format!("SIN({}) + COS({})", gen_expr(rng, depth - 1), gen_atom(rng)),
    }
}

/// Bruit : caractères du langage tirés au hasard (souvent invalide).
fn gen_bruit(rng: &mut Rng, n: usize) -> String {
    const ALPHABET: &[&str] = &[
        "(", ")", ",", "1", "2.5", "x", "MAX", "IF", "+", "-", "*", "<=", "!", "&&", "\"a\"", " ",
        "e", "3e", "#", "\"",
    ];
    (0..n)
        .map(|_| ALPHABET[rng.pick(ALPHABET.len() as u32) as usize])
        .collect()
}

fn expression(src: &str) -> Expression {
    Expression::new(src).with("x", 3.0).with("y", 0.5)
}

/* ------------------------ Tests ------------------------ */

#[test]
fn fuzz_safe_generees_compilent_et_rpn_reproductible() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);

    // Même seed => mêmes expressions => mêmes sorties (déterminisme)
    let mut rng = Rng::new(0xC0FFEE_u64);

    for _ in 0..150 {
        budget(t0, max);

        let src = gen_expr(&mut rng, 4);
        let mut a = expression(&src);
        let mut b = expression(&src);

        let rpn_a = a
            .to_rpn()
            .unwrap_or_else(|e| panic!("src={src:?} err={e}"));
        let rpn_b = b.to_rpn().unwrap_or_else(|e| panic!("src={src:?} err={e}"));
        assert_eq!(rpn_a, rpn_b, "src={src:?}");

        // évaluation : même résultat (ou même erreur) des deux côtés
        let va = a.eval().map_err(|e| e.to_string());
        let vb = b.eval().map_err(|e| e.to_string());
        match (&va, &vb) {
            (Ok(Variant::Number(x)), Ok(Variant::Number(y))) if x.is_nan() => {
                assert!(y.is_nan(), "src={src:?}");
            }
            _ => assert_eq!(va, vb, "src={src:?}"),
        }
    }
}

#[test]
fn fuzz_safe_bruit_jamais_de_panique() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);

    let mut rng = Rng::new(0xBADC0DE_u64);

    let mut seen_ok = 0usize;
    let mut seen_err = 0usize;

    for _ in 0..400 {
        budget(t0, max);

        let n = 1 + rng.pick(12) as usize;
        let src = gen_bruit(&mut rng, n);
        match expression(&src).eval() {
            Ok(_) => seen_ok += 1,
            Err(e) => {
                assert!(!e.message().is_empty(), "src={src:?}");
                seen_err += 1;
            }
        }
    }

    // On veut voir des erreurs, sinon le bruit est trop “sage”.
    assert!(seen_err > 0, "aucune erreur vue");
    assert!(seen_ok + seen_err == 400);
}

#[test]
fn fuzz_safe_determinisme_du_generateur() {
    let mut a = Rng::new(42);
    let mut b = Rng::new(42);
    for _ in 0..20 {
        assert_eq!(gen_expr(&mut a, 3), gen_expr(&mut b, 3));
    }
}

/* ------------------------ Helper somme balancée ------------------------ */

fn somme_balancee(terme: &str, n: usize) -> String {
    let mut items: Vec<String> = (0..n).map(|_| terme.to_string()).collect();
    while items.len() > 1 {
        let mut next = Vec::new();
        let mut i = 0;
        while i < items.len() {
            if i + 1 < items.len() {
                next.push(format!("({}+{})", items[i], items[i + 1]));
                i += 2;
            } else {
                next.push(items[i].clone());
                i += 1;
            }
        }
        items = next;
    }
    items.pop().unwrap_or_else(|| "0".to_string())
}

#[test]
fn fuzz_safe_somme_balancee() {
    let t0 = Instant::now();
    let max = Duration::from_millis(500);

    let src = somme_balancee("0.5", 800);
    let v = Expression::new(&src)
        .eval()
        .unwrap_or_else(|e| panic!("err: {e}"));
    budget(t0, max);

    // 800*(1/2) = 400
    assert_eq!(v, Variant::Number(400.0));
}
