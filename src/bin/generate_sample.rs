use anyhow::{Context, Result};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Income grows with age; the label leans "yes" for high earners.
fn sample_row(rng: &mut SimpleRng) -> (i64, i64, &'static str) {
    let age = 18.0 + rng.next_f64() * 52.0;
    let income = (18_000.0 + age * 1_100.0 + rng.gauss(0.0, 12_000.0)).max(8_000.0);
    let score = (income - 55_000.0) / 15_000.0 + rng.gauss(0.0, 0.8);
    let label = if score > 0.0 { "yes" } else { "no" };
    (age.round() as i64, (income / 100.0).round() as i64 * 100, label)
}

fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_data.csv".to_string());
    let rows = 200;

    let mut rng = SimpleRng::new(42);
    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("Failed to create {output_path}"))?;
    writer.write_record(["age", "income", "label"])?;

    let mut positives = 0;
    for _ in 0..rows {
        let (age, income, label) = sample_row(&mut rng);
        if label == "yes" {
            positives += 1;
        }
        writer.write_record([age.to_string(), income.to_string(), label.to_string()])?;
    }
    writer.flush().context("Failed to flush CSV writer")?;

    println!("Wrote {rows} rows ({positives} labelled yes) to {output_path}");
    Ok(())
}
