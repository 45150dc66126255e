//! Marker construction
//!
//! Turns a catalog record into the icon marker shown on the map, including
//! the hover and click tooltips. Every string that originates from players
//! (waystone names, player names, world names) is HTML-escaped before it is
//! embedded.

use chrono::Local;

use crate::catalog::Record;
use crate::directory::Directory;
use crate::icons::{OPEN_ICON_KEY, RESTRICTED_ICON_KEY};
use crate::surface::MarkerSpec;
use crate::types::{MapPoint, MarkerKey, RecordId};

const UNKNOWN_OWNER: &str = "Unknown";
const UNKNOWN_REGION: &str = "Unknown World";
const UNKNOWN_TIME: &str = "Unknown";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const STYLE_CONTAINER: &str = "padding: 12px; font-family: sans-serif; min-width: 200px;";
const STYLE_HEADER: &str =
    "margin: 0 0 12px 0; color: #5c7cfa; border-bottom: 2px solid #5c7cfa; padding-bottom: 4px;";
const STYLE_TABLE: &str = "width: 100%; border-collapse: collapse;";
const STYLE_LABEL: &str = "padding: 4px 8px; font-weight: bold; color: #495057;";
const STYLE_VALUE: &str = "padding: 4px 8px; color: #212529;";

const ACCESS_PRIVATE: &str = "<span style='color: #ff6b6b;'>🔒 Private</span>";
const ACCESS_PUBLIC: &str = "<span style='color: #51cf66;'>🔓 Public</span>";

/// Marker key for a record. Stable across refreshes.
pub fn marker_key(id: &RecordId) -> MarkerKey {
    MarkerKey::new(format!("waystone_{}", id))
}

/// Escape the characters that matter inside HTML text and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Builds markers for records
#[derive(Debug, Clone)]
pub struct MarkerFactory {
    icon_size: u32,
}

impl MarkerFactory {
    pub fn new(icon_size: u32) -> Self {
        Self { icon_size }
    }

    /// Build the marker for one record
    pub fn build(&self, record: &Record, directory: &dyn Directory) -> MarkerSpec {
        let icon = if record.locked {
            RESTRICTED_ICON_KEY
        } else {
            OPEN_ICON_KEY
        };

        MarkerSpec {
            icon: icon.to_string(),
            point: MapPoint::from(record.position),
            size: self.icon_size,
            hover_tooltip: hover_tooltip(record),
            click_tooltip: click_tooltip(record, directory),
        }
    }
}

fn hover_tooltip(record: &Record) -> String {
    format!(
        "<div style='text-align: center; padding: 5px; font-family: sans-serif;'>\
         <b style='font-size: 14px; color: #5c7cfa;'>{}</b></div>",
        escape_html(&record.name)
    )
}

fn click_tooltip(record: &Record, directory: &dyn Directory) -> String {
    let owner = directory
        .owner_name(&record.owner)
        .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
    let region = directory
        .region_name(&record.region)
        .unwrap_or_else(|| UNKNOWN_REGION.to_string());
    let created = record
        .created_at
        .map(|at| at.with_timezone(&Local).format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN_TIME.to_string());
    let access = if record.locked {
        ACCESS_PRIVATE
    } else {
        ACCESS_PUBLIC
    };

    let mut html = String::with_capacity(1024);
    html.push_str(&format!(
        "<div style='{STYLE_CONTAINER}'><h3 style='{STYLE_HEADER}'>{}</h3><table style='{STYLE_TABLE}'>",
        escape_html(&record.name)
    ));
    table_row(&mut html, "Owner:", &escape_html(&owner), "");
    table_row(&mut html, "Access:", access, "");
    table_row(&mut html, "World:", &escape_html(&region), "");
    table_row(&mut html, "Location:", &record.position.to_string(), " font-family: monospace;");
    table_row(&mut html, "Created:", &escape_html(&created), " color: #868e96; font-size: 12px;");
    html.push_str("</table></div>");
    html
}

/// `value` must already be safe HTML
fn table_row(html: &mut String, label: &str, value: &str, extra_style: &str) {
    html.push_str(&format!(
        "<tr><td style='{STYLE_LABEL}'>{label}</td><td style='{STYLE_VALUE}{extra_style}'>{value}</td></tr>"
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::types::{Position, RegionId};
    use chrono::{TimeZone, Utc};

    fn directory() -> StaticDirectory {
        StaticDirectory::default()
            .with_world("world", "Overworld", None)
            .with_owner("u1", "Steve")
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("Plain Name"), "Plain Name");
    }

    #[test]
    fn test_marker_key_is_derived_from_id() {
        assert_eq!(marker_key(&RecordId::new("42")), MarkerKey::new("waystone_42"));
    }

    #[test]
    fn test_icon_follows_visibility() {
        let factory = MarkerFactory::new(24);
        let record = Record::new("1", "Spawn", Position::new(10, 64, 20), "world", "u1");

        let open = factory.build(&record, &directory());
        assert_eq!(open.icon, OPEN_ICON_KEY);
        assert_eq!(open.size, 24);
        assert!(open.click_tooltip.contains("Public"));

        let restricted = factory.build(&record.clone().locked(true), &directory());
        assert_eq!(restricted.icon, RESTRICTED_ICON_KEY);
        assert!(restricted.click_tooltip.contains("Private"));
    }

    #[test]
    fn test_placed_at_x_z_with_full_coordinates_in_details() {
        let record = Record::new("1", "Spawn", Position::new(10, 64, 20), "world", "u1");
        let spec = MarkerFactory::new(16).build(&record, &directory());

        assert_eq!(spec.point, MapPoint { x: 10.0, z: 20.0 });
        assert!(spec.click_tooltip.contains("10, 64, 20"));
        assert!(spec.click_tooltip.contains("Steve"));
        assert!(spec.click_tooltip.contains("Overworld"));
        assert!(spec.hover_tooltip.contains("Spawn"));
    }

    #[test]
    fn test_player_text_is_escaped() {
        let record = Record::new("1", "<img src=x onerror=alert(1)>", Position::new(0, 0, 0), "world", "u2");
        let directory = StaticDirectory::default()
            .with_world("world", "W<orld>", Some(RegionId::new("world")))
            .with_owner("u2", "Bob's <b>");

        let spec = MarkerFactory::new(16).build(&record, &directory);

        assert!(!spec.hover_tooltip.contains("<img"));
        assert!(!spec.click_tooltip.contains("<img"));
        assert!(spec.click_tooltip.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(spec.click_tooltip.contains("Bob&#39;s &lt;b&gt;"));
        assert!(spec.click_tooltip.contains("W&lt;orld&gt;"));
    }

    #[test]
    fn test_unresolved_names_fall_back() {
        let record = Record::new("1", "Lost", Position::new(0, 0, 0), "nowhere", "ghost");
        let spec = MarkerFactory::new(16).build(&record, &directory());

        assert!(spec.click_tooltip.contains(">Unknown<"));
        assert!(spec.click_tooltip.contains("Unknown World"));
    }

    #[test]
    fn test_creation_time_in_local_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 10, 15, 0).unwrap();
        let record = Record::new("1", "Spawn", Position::new(0, 0, 0), "world", "u1").created_at(at);

        let spec = MarkerFactory::new(16).build(&record, &directory());

        let expected = at.with_timezone(&Local).format(DATE_FORMAT).to_string();
        assert!(spec.click_tooltip.contains(&expected));
    }
}
