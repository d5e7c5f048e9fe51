//! # Board Renderer
//!
//! Composes the [`ScrollingField`]s of every slot into a [`BoardGrid`].
//!
//! The renderer is an owned value driven by three calls:
//! - [`BoardRenderer::update`] at the refresh cadence with fresh departures
//! - [`BoardRenderer::tick`] at the animation cadence with the elapsed time
//! - [`BoardRenderer::frame`] right after each tick to produce the grid
//!
//! `update` takes `&mut self` and finishes every slot before returning, so a
//! frame never mixes old and new departures.

use crate::field::{Motion, ScrollingField};
use crate::grid::BoardGrid;
use crate::layout::{BoardLayout, FieldKind, FieldLayout};
use crate::Departure;
use std::time::Duration;
use tracing::debug;

struct PlacedField {
    kind: FieldKind,
    layout: FieldLayout,
    field: ScrollingField,
}

pub struct BoardRenderer {
    layout: BoardLayout,
    blank: char,
    slots: Vec<Vec<PlacedField>>,
}

impl BoardRenderer {
    pub fn new(layout: BoardLayout, motion: Motion, blank: char) -> Self {
        let slots = layout
            .slots()
            .iter()
            .map(|slot| {
                slot.fields
                    .iter()
                    .map(|&(kind, field_layout)| PlacedField {
                        kind,
                        layout: field_layout,
                        field: ScrollingField::new(field_layout.width, motion, blank),
                    })
                    .collect()
            })
            .collect();

        Self {
            layout,
            blank,
            slots,
        }
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    /// Fill character for cells outside any field
    pub fn blank(&self) -> char {
        self.blank
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Show `departures` in order, one per slot.
    ///
    /// Departures beyond the slot count are ignored; slots without a
    /// departure become blank. A field whose text is unchanged keeps its
    /// scroll position.
    pub fn update(&mut self, departures: &[Departure]) {
        let mut replaced = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let departure = departures.get(index);
            for placed in slot.iter_mut() {
                let text = departure
                    .map(|d| placed.kind.text(d))
                    .unwrap_or_default();
                if placed.field.text() != text {
                    placed.field.set_text(&text);
                    replaced += 1;
                }
            }
        }
        debug!(
            departures = departures.len(),
            replaced, "board updated"
        );
    }

    /// Advance every field's animation by `elapsed`.
    pub fn tick(&mut self, elapsed: Duration) {
        for placed in self.slots.iter_mut().flatten() {
            placed.field.tick(elapsed);
        }
    }

    /// Current contents of the whole display.
    pub fn frame(&self) -> BoardGrid {
        let mut grid = BoardGrid::blank(self.layout.rows(), self.layout.columns(), self.blank);
        for placed in self.slots.iter().flatten() {
            let visible: Vec<char> = placed.field.render().chars().collect();
            grid.write(placed.layout.row, placed.layout.start_column, &visible);
        }
        grid
    }

    /// True when no slot has any text to show.
    pub fn is_empty(&self) -> bool {
        self.slots
            .iter()
            .flatten()
            .all(|placed| placed.field.text().is_empty())
    }

    #[cfg(test)]
    fn field(&self, slot: usize, kind: FieldKind) -> &ScrollingField {
        &self.slots[slot]
            .iter()
            .find(|p| p.kind == kind)
            .expect("field kind present in slot")
            .field
    }
}
