//! The static fallback question bank.
//!
//! Served whenever no question file is available and whenever remote
//! generation is disabled or fails.

use crate::model::Question;

fn question(id: u32, text: &str, options: [&str; 4], correct: usize, explanation: &str) -> Question {
    Question {
        id,
        question: text.to_string(),
        options: options.map(String::from),
        correct_answer: correct,
        explanation: explanation.to_string(),
        times_used: 0,
        times_correct: 0,
    }
}

/// Ten Year 7 questions covering equations, percentages, rates, area,
/// proportion, and sequences.
pub fn fallback_questions() -> Vec<Question> {
    vec![
        question(
            1,
            "Solve: 3x + 5 = 20",
            ["3", "5", "7", "15"],
            1,
            "Subtract 5 from both sides: 3x = 15, then divide by 3: x = 5",
        ),
        question(
            2,
            "If 2x - 3 = 11, what is the value of x?",
            ["5", "7", "8", "9"],
            1,
            "Add 3 to both sides: 2x = 14, then divide by 2: x = 7",
        ),
        question(
            3,
            "Solve: 4(x + 2) = 24",
            ["2", "4", "6", "8"],
            1,
            "Divide both sides by 4: x + 2 = 6, then subtract 2: x = 4",
        ),
        question(
            4,
            "If 5x + 3 = 3x + 9, what is the value of x?",
            ["2", "3", "4", "5"],
            1,
            "Subtract 3x from both sides: 2x + 3 = 9, then subtract 3: 2x = 6, then divide by 2: x = 3",
        ),
        question(
            5,
            "A store sells shirts for $25 each. If they have a 20% discount, what is the final price?",
            ["$15", "$18", "$20", "$22"],
            2,
            "20% of $25 is $5 (25 × 0.2 = 5). So the discounted price is $25 - $5 = $20",
        ),
        question(
            6,
            "A train travels 120 kilometers in 2 hours. What is its speed in kilometers per hour?",
            ["40", "50", "60", "70"],
            2,
            "Speed = Distance ÷ Time = 120 ÷ 2 = 60 km/h",
        ),
        question(
            7,
            "If a rectangle has a length of 8cm and a width of 5cm, what is its area?",
            ["13cm²", "26cm²", "40cm²", "45cm²"],
            2,
            "Area = length × width = 8 × 5 = 40cm²",
        ),
        question(
            8,
            "A recipe requires 3/4 cup of sugar for 6 servings. How much sugar is needed for 8 servings?",
            ["1 cup", "1 1/4 cups", "1 1/2 cups", "2 cups"],
            0,
            "If 6 servings need 3/4 cup, then 1 serving needs 3/4 ÷ 6 = 1/8 cup. For 8 servings: 1/8 × 8 = 1 cup",
        ),
        question(
            9,
            "What is the next number in the sequence: 2, 4, 8, 16, ...?",
            ["20", "24", "32", "36"],
            2,
            "The pattern is multiplying by 2 each time: 2×2=4, 4×2=8, 8×2=16, 16×2=32",
        ),
        question(
            10,
            "What is the next number in the sequence: 3, 6, 12, 24, ...?",
            ["30", "36", "48", "54"],
            2,
            "The pattern is multiplying by 2 each time: 3×2=6, 6×2=12, 12×2=24, 24×2=48",
        ),
    ]
}
