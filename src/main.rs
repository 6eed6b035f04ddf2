//! # Reframe CLI
//!
//! Usage:
//!   reframe composition.json -o audit.png
//!   echo '{ ... }' | reframe -o audit.png
//!   reframe --example > composition.json

use std::env;
use std::fs;
use std::io::{self, Read};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Handle --example flag
    if args.iter().any(|a| a == "--example") {
        print!("{}", example_composition_json());
        return;
    }

    // Read input
    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).expect("Failed to read input file")
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).expect("Failed to read stdin");
        buf
    };

    // Parse output path
    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "audit.png".to_string());

    // Render
    match reframe::compose_audit_json(&input) {
        Ok(audit) => {
            audit.save(&output_path).expect("Failed to write PNG");
            eprintln!(
                "✓ Written {}x{} audit render to {}",
                audit.width(),
                audit.height(),
                output_path
            );
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    }
}

fn example_composition_json() -> &'static str {
    r##"{
  "container": { "x": 50, "y": 50, "w": 400, "h": 400 },
  "layers": [
    {
      "id": "artwork/hero",
      "name": "Hero",
      "kind": { "type": "Raster" },
      "opacity": 0.85,
      "bounds": { "x": 100, "y": 100, "w": 50, "h": 50 }
    },
    {
      "id": "artwork/backdrop",
      "name": "Backdrop slot",
      "kind": { "type": "GenerativePlaceholder" },
      "bounds": { "x": 60, "y": 60, "w": 380, "h": 380 }
    }
  ],
  "rasters": {
    "artwork/hero": "./hero.png"
  },
  "overrides": [
    {
      "layerId": "artwork/hero",
      "xOffset": 10,
      "yOffset": -5,
      "individualScale": 2.0,
      "citedRule": "hero fills the upper-left quadrant"
    }
  ]
}
"##
}
