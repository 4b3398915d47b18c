use serde_json::json;

use crate::cli::utils::{format_cell, format_position, output_success};
use crate::cli::{CliContext, OutputFormat};
use crate::layout::{self, find_empty_slot, Position};

/// Parse `X,Y` into a position.
pub fn parse_point(value: &str) -> Result<Position, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", value))?;

    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{}': {}", part.trim(), e))
    };
    Ok(Position::new(parse(x)?, parse(y)?))
}

pub fn grid(ctx: &CliContext) -> anyhow::Result<()> {
    let geometry = &ctx.geometry;

    match ctx.output {
        OutputFormat::Json => {
            let cells: Vec<_> = geometry
                .cells()
                .map(|cell| json!({ "cell": cell, "position": geometry.anchor(cell) }))
                .collect();
            output_success(
                &ctx.output,
                "Grid geometry",
                Some(json!({ "geometry": geometry, "cells": cells })),
            )
        }
        OutputFormat::Text => {
            println!(
                "Interior {}x{}px, padding {}px, {} columns x {} rows",
                geometry.interior_width, geometry.interior_height, geometry.padding, geometry.columns, geometry.rows
            );
            println!(
                "Cell {:.2}x{:.2}px, icon {}x{}px",
                geometry.cell_width, geometry.cell_height, geometry.item_width, geometry.item_height
            );
            for row in 0..geometry.rows {
                let anchors: Vec<String> = (0..geometry.columns)
                    .map(|col| format_position(geometry.anchor(layout::Cell::new(col, row))))
                    .collect();
                println!("row {}: {}", row, anchors.join(" "));
            }
            Ok(())
        }
    }
}

pub fn snap(ctx: &CliContext, x: f64, y: f64) -> anyhow::Result<()> {
    let snapped = layout::snap(&ctx.geometry, Position::new(x, y));

    output_success(
        &ctx.output,
        &format!(
            "{} snaps to {} at {}",
            format_position(Position::new(x, y)),
            format_cell(snapped.cell),
            format_position(snapped.position)
        ),
        Some(snapped),
    )
}

pub fn slot(ctx: &CliContext, occupied: &[Position]) -> anyhow::Result<()> {
    let slot = find_empty_slot(&ctx.geometry, occupied);

    let message = if slot.fallback {
        format!(
            "Grid is full; falling back to {} at {}",
            format_cell(slot.cell),
            format_position(slot.position)
        )
    } else {
        format!("First empty cell is {} at {}", format_cell(slot.cell), format_position(slot.position))
    };
    output_success(&ctx.output, &message, Some(slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points() {
        assert_eq!(parse_point("35,43"), Ok(Position::new(35.0, 43.0)));
        assert_eq!(parse_point(" -1.5 , 2 "), Ok(Position::new(-1.5, 2.0)));
        assert!(parse_point("35").is_err());
        assert!(parse_point("a,1").is_err());
    }
}
