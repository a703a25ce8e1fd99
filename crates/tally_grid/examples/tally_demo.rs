//! Tally Grid Demo
//!
//! Headless walkthrough of a tally board: tapping a button bumps its count,
//! the refresh timer repaints titles, and the layout is printed per line.
//!
//! Run with: RUST_LOG=tally_grid=debug cargo run -p tally_grid --example tally_demo

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tally_core::Scheduler;
use tally_grid::{ButtonGridView, GridConfig, GridItem, Result};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Entry {
    Tally(&'static str),
    Add,
}

impl GridItem for Entry {
    fn keep_small(&self) -> bool {
        matches!(self, Entry::Add)
    }
}

const CONFIG: &str = r#"
margin = 12.0
gap = 12.0
section_gap = 24.0
"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = GridConfig::from_toml_str(CONFIG)?;
    let scheduler = Scheduler::new(Instant::now());
    let counts: Rc<RefCell<HashMap<&'static str, u32>>> = Rc::default();

    let painted = counts.clone();
    let grid = ButtonGridView::new(config, &scheduler, move |button, entry: &Entry| {
        let title = match entry {
            Entry::Tally(name) => {
                let count = painted.borrow().get(name).copied().unwrap_or(0);
                format!("{name} ({count})")
            }
            Entry::Add => "+".to_string(),
        };
        button.set_title(Some(title));
    });

    let tapped = counts.clone();
    let _selection = grid.selection().subscribe(move |(_, entry)| {
        if let Entry::Tally(name) = entry {
            *tapped.borrow_mut().entry(*name).or_insert(0) += 1;
        }
    });

    grid.set_width(375.0);
    grid.set_buttons(vec![
        vec![
            Entry::Tally("Coffee"),
            Entry::Tally("Tea"),
            Entry::Tally("Water"),
            Entry::Tally("Sparkling water"),
        ],
        vec![Entry::Add],
    ]);
    print_lines(&grid);

    for _ in 0..3 {
        if let Some(button) = grid.button_for(&Entry::Tally("Coffee")) {
            button.tap();
        }
    }

    // Titles change on the next refresh; sizes follow on the next layout
    scheduler.advance_by(Duration::from_secs(1));
    grid.layout_if_needed();
    print_lines(&grid);

    grid.teardown();
    Ok(())
}

fn print_lines(grid: &ButtonGridView<Entry>) {
    for (index, line) in grid.lines().iter().enumerate() {
        let cells: Vec<String> = line
            .iter()
            .map(|(_, button)| {
                let frame = button.frame();
                format!(
                    "{} @ {:.0},{:.0} w{:.0}",
                    button.title().unwrap_or_default(),
                    frame.x(),
                    frame.y(),
                    frame.width()
                )
            })
            .collect();
        println!("line {index}: {}", cells.join(" | "));
    }
    println!("content height {:.0}", grid.content_height());
}
