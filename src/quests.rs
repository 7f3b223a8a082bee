use rand::Rng;

/// A generated math question and its expected answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathProblem {
    pub question: String,
    pub answer: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "×",
            Operator::Divide => "÷",
        }
    }

    /// operators unlocked at this difficulty
    fn available(difficulty: u32) -> &'static [Operator] {
        match difficulty {
            0..=1 => &[Operator::Add, Operator::Subtract],
            2..=3 => &[Operator::Add, Operator::Subtract, Operator::Multiply],
            _ => &[
                Operator::Add,
                Operator::Subtract,
                Operator::Multiply,
                Operator::Divide,
            ],
        }
    }
}

/// largest operand for add/subtract
fn operand_limit(difficulty: u32) -> i64 {
    10 * i64::from(difficulty.clamp(1, 1_000))
}

/// smaller range for multiply/divide
fn factor_limit(difficulty: u32) -> i64 {
    (5 + 2 * i64::from(difficulty.clamp(1, 1_000))).min(99)
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, difficulty: u32) -> MathProblem {
    let ops = Operator::available(difficulty);
    let op = ops[rng.random_range(0..ops.len())];
    let limit = operand_limit(difficulty);
    let factors = factor_limit(difficulty);

    let (a, b, answer) = match op {
        Operator::Add => {
            let a = rng.random_range(1..=limit);
            let b = rng.random_range(1..=limit);
            (a, b, a + b)
        }
        Operator::Subtract => {
            let x = rng.random_range(1..=limit);
            let y = rng.random_range(1..=limit);
            let (a, b) = if x >= y { (x, y) } else { (y, x) };
            (a, b, a - b)
        }
        Operator::Multiply => {
            let a = rng.random_range(2..=factors);
            let b = rng.random_range(2..=factors);
            (a, b, a * b)
        }
        Operator::Divide => {
            let b = rng.random_range(2..=factors);
            let quotient = rng.random_range(1..=factors);
            (b * quotient, b, quotient)
        }
    };

    MathProblem {
        question: format!("What is {} {} {}?", a, op.symbol(), b),
        answer,
    }
}

/// Lenient check: surrounding whitespace, a leading '+' and
/// thousands separators are ignored.
pub fn is_correct(expected: i64, given: &str) -> bool {
    let cleaned: String = given
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    cleaned.parse::<i64>().map(|v| v == expected).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn parse(question: &str) -> (i64, &str, i64) {
        let body = question
            .strip_prefix("What is ")
            .and_then(|s| s.strip_suffix('?'))
            .unwrap();
        let parts: Vec<&str> = body.split(' ').collect();
        (parts[0].parse().unwrap(), parts[1], parts[2].parse().unwrap())
    }

    #[test]
    fn test_answers_match_questions() {
        let mut rng = StdRng::seed_from_u64(7);
        for difficulty in 1..=8 {
            for _ in 0..50 {
                let problem = generate(&mut rng, difficulty);
                let (a, op, b) = parse(&problem.question);
                let expected = match op {
                    "+" => a + b,
                    "-" => a - b,
                    "×" => a * b,
                    "÷" => {
                        assert_eq!(a % b, 0);
                        a / b
                    }
                    other => panic!("unexpected operator {}", other),
                };
                assert_eq!(problem.answer, expected);
                assert!(problem.answer >= 0);
            }
        }
    }

    #[test]
    fn test_difficulty_one_is_add_or_subtract() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let problem = generate(&mut rng, 1);
            let (a, op, b) = parse(&problem.question);
            assert!(op == "+" || op == "-");
            assert!(a <= 10 && b <= 10);
        }
    }

    #[test]
    fn test_lenient_answer_check() {
        assert!(is_correct(42, "42"));
        assert!(is_correct(42, "  42 "));
        assert!(is_correct(1200, "1,200"));
        assert!(is_correct(7, "+7"));
        assert!(!is_correct(42, "41"));
        assert!(!is_correct(42, "forty-two"));
        assert!(!is_correct(0, ""));
    }
}
