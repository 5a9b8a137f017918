//! Interactive task selection.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, anyhow};
use rand::Rng;
use rand::seq::SliceRandom;

/// Built-in programs offered when the user has no idea of their own.
pub const PROGRAMS: &[&str] = &[
    "Write a Python program to check if a number is a palindrome.",
    "Write a Python program to find the kth smallest element in a given binary search tree.",
    "Write a Python program to check if a number is prime.",
    "Write a Python program that returns the longest common subsequence of two strings.",
    "Write a Python program that merges overlapping intervals in a list of intervals.",
    "Write a Python program that evaluates an arithmetic expression given as a string.",
];

const QUESTION: &str = "I'm Super Coder. Tell me, which program would you like me to code for you? \
If you don't have an idea, just press Enter and I will choose a random program to code: ";

/// Ask for a task on `output`, read one line from `input`.
///
/// An empty answer picks a random entry of [`PROGRAMS`] and announces it.
pub fn prompt_for_task<R, W, G>(input: &mut R, output: &mut W, rng: &mut G) -> Result<String>
where
    R: BufRead,
    W: Write,
    G: Rng + ?Sized,
{
    write!(output, "{QUESTION}").context("write task question")?;
    output.flush().context("flush console")?;

    let mut line = String::new();
    input.read_line(&mut line).context("read task from console")?;
    let answer = line.trim();
    if !answer.is_empty() {
        return Ok(answer.to_string());
    }

    let chosen = PROGRAMS
        .choose(rng)
        .ok_or_else(|| anyhow!("program list is empty"))?;
    writeln!(output, "Randomly chosen program: {chosen}").context("write chosen program")?;
    Ok((*chosen).to_string())
}
