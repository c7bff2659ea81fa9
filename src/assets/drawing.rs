//! Drawing and chart part parsing.
//!
//! A worksheet's drawing part anchors graphical objects to the grid with
//! `oneCellAnchor`/`twoCellAnchor` elements. Each anchor names the object
//! (`cNvPr`), pins it to cell coordinates, and points at its payload by
//! relationship id: `c:chart r:id` for an embedded chart, `a:blip r:embed`
//! for a picture. Chart parts are parsed separately for the plot kind and
//! series names.

use crate::addr;
use crate::error::{SheetError, SheetResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One anchored object in a drawing part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawingAnchor {
    pub name: String,
    /// Relationship id of an embedded chart (`c:chart r:id`).
    pub chart_rid: Option<String>,
    /// Relationship id of an embedded picture (`a:blip r:embed`).
    pub image_rid: Option<String>,
    /// 1-based grid position: `B2:D8`, or a single address for one-cell
    /// anchors.
    pub anchor: String,
}

#[derive(Default)]
struct AnchorState {
    name: String,
    chart_rid: Option<String>,
    image_rid: Option<String>,
    from: (u32, u32), // (row, col)
    to: Option<(u32, u32)>,
}

#[derive(Clone, Copy, PartialEq)]
enum Corner {
    None,
    From,
    To,
}

#[derive(Clone, Copy, PartialEq)]
enum Coord {
    None,
    Col,
    Row,
}

/// Parse a drawing part into its anchors, in document order.
pub fn parse_drawing(xml: &[u8]) -> SheetResult<Vec<DrawingAnchor>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut anchors = Vec::new();
    let mut current: Option<AnchorState> = None;
    let mut corner = Corner::None;
    let mut coord = Coord::None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"oneCellAnchor" | b"twoCellAnchor" => {
                    current = Some(AnchorState::default());
                }
                b"from" if current.is_some() => corner = Corner::From,
                b"to" if current.is_some() => corner = Corner::To,
                b"col" if corner != Corner::None => coord = Coord::Col,
                b"row" if corner != Corner::None => coord = Coord::Row,
                _ => handle_object_element(e, &mut current),
            },
            Ok(Event::Empty(ref e)) => handle_object_element(e, &mut current),
            Ok(Event::Text(ref t)) if coord != Coord::None => {
                if let (Some(state), Ok(text)) = (current.as_mut(), t.unescape()) {
                    if let Ok(n) = text.trim().parse::<u32>() {
                        let cell = match corner {
                            Corner::To => state.to.get_or_insert((0, 0)),
                            _ => &mut state.from,
                        };
                        match coord {
                            Coord::Col => cell.1 = n,
                            Coord::Row => cell.0 = n,
                            Coord::None => {}
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"oneCellAnchor" | b"twoCellAnchor" => {
                    if let Some(state) = current.take() {
                        anchors.push(finish_anchor(state));
                    }
                }
                b"from" | b"to" => corner = Corner::None,
                b"col" | b"row" => coord = Coord::None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SheetError::Archive(format!("Malformed drawing part: {}", e)));
            }
        }
        buf.clear();
    }
    Ok(anchors)
}

fn handle_object_element(e: &BytesStart<'_>, current: &mut Option<AnchorState>) {
    let Some(state) = current.as_mut() else {
        return;
    };
    match e.local_name().as_ref() {
        b"cNvPr" if state.name.is_empty() => {
            for attr in e.attributes().flatten() {
                if attr.key.local_name().as_ref() == b"name" {
                    state.name = String::from_utf8_lossy(&attr.value).into_owned();
                }
            }
        }
        b"chart" => state.chart_rid = rid_attribute(e, b"id"),
        b"blip" => state.image_rid = rid_attribute(e, b"embed"),
        _ => {}
    }
}

fn rid_attribute(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn finish_anchor(state: AnchorState) -> DrawingAnchor {
    let from = addr::cell_name(state.from.0, state.from.1);
    let anchor = match state.to {
        Some((row, col)) => format!("{}:{}", from, addr::cell_name(row, col)),
        None => from,
    };
    DrawingAnchor {
        name: state.name,
        chart_rid: state.chart_rid,
        image_rid: state.image_rid,
        anchor,
    }
}

/// Plot kind of a chart part: the first plot-area child element named
/// `*Chart` (`barChart` → `bar`). Unrecognized parts report `unknown`.
pub fn chart_type(xml: &[u8]) -> String {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_plot_area = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let local = e.local_name().as_ref().to_vec();
                if local == b"plotArea" {
                    in_plot_area = true;
                } else if in_plot_area && local.ends_with(b"Chart") {
                    let name = String::from_utf8_lossy(&local).into_owned();
                    return name[..name.len() - "Chart".len()].to_string();
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"plotArea" => break,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => break,
        }
        buf.clear();
    }
    "unknown".to_string()
}

/// Series names of a chart part, in document order. A series without a
/// literal name is reported positionally (`Series 2`).
pub fn chart_series(xml: &[u8]) -> Vec<String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut series = Vec::new();
    let mut in_ser = false;
    let mut in_tx = false;
    let mut in_value = false;
    let mut name: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"ser" => {
                    in_ser = true;
                    name = None;
                }
                b"tx" if in_ser => in_tx = true,
                b"v" if in_tx => in_value = true,
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_value && name.is_none() => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        name = Some(text.to_string());
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"ser" => {
                    in_ser = false;
                    series.push(
                        name.take()
                            .unwrap_or_else(|| format!("Series {}", series.len() + 1)),
                    );
                }
                b"tx" => in_tx = false,
                b"v" => in_value = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => break,
        }
        buf.clear();
    }
    series
}
