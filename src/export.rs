//! Route serializers: GPX 1.1, KML 2.2 and a CSV coordinate list.
//!
//! All three visit the route elements (everything except rescue zones and
//! freehand annotations) in `order`. Rescue zones only appear in KML, as
//! polygons.

use std::io::Cursor;

use log::info;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{CourseError, Result};
use crate::metadata::parse_vertices;
use crate::{CourseData, CourseElement, ElementType};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

const GPX_CREATOR: &str = "OW Parcour Designer";
const KML_LOOKAT_RANGE_M: u32 = 1500;
const KML_LOOKAT_TILT: u32 = 45;

fn export_error<E: std::fmt::Display>(err: E) -> CourseError {
    CourseError::Export {
        message: err.to_string(),
    }
}

fn new_writer() -> Result<XmlWriter> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(export_error)?;
    Ok(writer)
}

fn finish_writer(writer: XmlWriter) -> Result<String> {
    String::from_utf8(writer.into_inner().into_inner()).map_err(export_error)
}

fn write_tag_start(writer: &mut XmlWriter, tag_name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(tag_name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Start(elem)).map_err(export_error)
}

fn write_tag_end(writer: &mut XmlWriter, tag_name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(tag_name)))
        .map_err(export_error)
}

fn write_tag(writer: &mut XmlWriter, tag_name: &str, content: &str) -> Result<()> {
    write_tag_start(writer, tag_name, &[])?;
    writer
        .write_event(Event::Text(BytesText::new(content)))
        .map_err(export_error)?;
    write_tag_end(writer, tag_name)
}

// ============================================================================
// GPX
// ============================================================================

/// GPX 1.1 document: one waypoint per route element plus a closed route
/// that returns to the first element.
pub fn build_gpx(course: &CourseData) -> Result<String> {
    let route = course.route_elements();
    let mut writer = new_writer()?;

    write_tag_start(
        &mut writer,
        "gpx",
        &[
            ("version", "1.1"),
            ("creator", GPX_CREATOR),
            ("xmlns", "http://www.topografix.com/GPX/1/1"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            (
                "xsi:schemaLocation",
                "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd",
            ),
        ],
    )?;

    write_tag_start(&mut writer, "metadata", &[])?;
    write_tag(&mut writer, "name", &course.name)?;
    write_tag_end(&mut writer, "metadata")?;

    for el in &route {
        let (lat, lon) = (el.lat.to_string(), el.lng.to_string());
        write_tag_start(&mut writer, "wpt", &[("lat", lat.as_str()), ("lon", lon.as_str())])?;
        write_tag(&mut writer, "name", &el.display_label())?;
        write_tag(&mut writer, "type", el.element_type.as_str())?;
        write_tag_end(&mut writer, "wpt")?;
    }

    write_tag_start(&mut writer, "rte", &[])?;
    write_tag(&mut writer, "name", &course.name)?;
    for el in &route {
        write_rtept(&mut writer, el, &el.display_label())?;
    }
    if let Some(first) = route.first() {
        write_rtept(&mut writer, first, "Return to start")?;
    }
    write_tag_end(&mut writer, "rte")?;
    write_tag_end(&mut writer, "gpx")?;

    info!("[Export] GPX with {} waypoints", route.len());
    finish_writer(writer)
}

fn write_rtept(writer: &mut XmlWriter, el: &CourseElement, name: &str) -> Result<()> {
    let (lat, lon) = (el.lat.to_string(), el.lng.to_string());
    write_tag_start(writer, "rtept", &[("lat", lat.as_str()), ("lon", lon.as_str())])?;
    write_tag(writer, "name", name)?;
    write_tag_end(writer, "rtept")
}

// ============================================================================
// KML
// ============================================================================

fn kml_icon(element_type: ElementType) -> &'static str {
    match element_type {
        ElementType::Buoy => "https://maps.google.com/mapfiles/kml/shapes/sailing.png",
        ElementType::Start => "https://maps.google.com/mapfiles/kml/paddle/go.png",
        ElementType::GateLeft | ElementType::GateRight => {
            "https://maps.google.com/mapfiles/kml/shapes/flag.png"
        }
        ElementType::ShoreEntry => "https://maps.google.com/mapfiles/kml/shapes/beach.png",
        ElementType::FeedingPlatform => "https://maps.google.com/mapfiles/kml/shapes/dining.png",
        ElementType::RescueZone => "https://maps.google.com/mapfiles/kml/shapes/hospitals.png",
        t if t.is_finish() => "https://maps.google.com/mapfiles/kml/paddle/stop.png",
        _ => "https://maps.google.com/mapfiles/kml/paddle/wht-blank.png",
    }
}

/// KML colors are aabbggrr.
fn kml_color(element_type: ElementType) -> &'static str {
    match element_type {
        ElementType::Buoy => "ff00bfff",
        ElementType::Start => "ff00ff00",
        ElementType::GateLeft | ElementType::GateRight => "ffff6633",
        ElementType::ShoreEntry => "ff0080ff",
        ElementType::FeedingPlatform => "ffed3a7c",
        ElementType::RescueZone => "ff4444ef",
        t if t.is_finish() => "ff0000ff",
        _ => "ffffffff",
    }
}

fn kml_coord(lat: f64, lng: f64) -> String {
    format!("{},{},0", lng, lat)
}

/// KML 2.2 document: per-type icon styles, a LookAt over the route
/// centroid, one placemark per route element, the closed route line and
/// rescue-zone polygons.
pub fn build_kml(course: &CourseData) -> Result<String> {
    let route = course.route_elements();
    let mut writer = new_writer()?;

    write_tag_start(&mut writer, "kml", &[("xmlns", "http://www.opengis.net/kml/2.2")])?;
    write_tag_start(&mut writer, "Document", &[])?;
    write_tag(&mut writer, "name", &course.name)?;

    // Styles, one per type present
    let mut style_types: Vec<ElementType> = Vec::new();
    for el in &course.elements {
        if !style_types.contains(&el.element_type) {
            style_types.push(el.element_type);
        }
    }
    for element_type in &style_types {
        let id = format!("style-{}", element_type);
        write_tag_start(&mut writer, "Style", &[("id", id.as_str())])?;
        write_tag_start(&mut writer, "IconStyle", &[])?;
        write_tag(&mut writer, "color", kml_color(*element_type))?;
        write_tag(&mut writer, "scale", "1.0")?;
        write_tag_start(&mut writer, "Icon", &[])?;
        write_tag(&mut writer, "href", kml_icon(*element_type))?;
        write_tag_end(&mut writer, "Icon")?;
        write_tag_end(&mut writer, "IconStyle")?;
        write_tag_end(&mut writer, "Style")?;
    }

    write_tag_start(&mut writer, "Style", &[("id", "route-line")])?;
    write_tag_start(&mut writer, "LineStyle", &[])?;
    write_tag(&mut writer, "color", "fff68235")?;
    write_tag(&mut writer, "width", "3")?;
    write_tag_end(&mut writer, "LineStyle")?;
    write_tag_end(&mut writer, "Style")?;

    write_tag_start(&mut writer, "Style", &[("id", "rescue-zone")])?;
    write_tag_start(&mut writer, "PolyStyle", &[])?;
    write_tag(&mut writer, "color", "554444ef")?;
    write_tag(&mut writer, "outline", "1")?;
    write_tag_end(&mut writer, "PolyStyle")?;
    write_tag_start(&mut writer, "LineStyle", &[])?;
    write_tag(&mut writer, "color", "ff4444ef")?;
    write_tag(&mut writer, "width", "2")?;
    write_tag_end(&mut writer, "LineStyle")?;
    write_tag_end(&mut writer, "Style")?;

    if !route.is_empty() {
        let n = route.len() as f64;
        let avg_lat = route.iter().map(|el| el.lat).sum::<f64>() / n;
        let avg_lng = route.iter().map(|el| el.lng).sum::<f64>() / n;
        write_tag_start(&mut writer, "LookAt", &[])?;
        write_tag(&mut writer, "longitude", &avg_lng.to_string())?;
        write_tag(&mut writer, "latitude", &avg_lat.to_string())?;
        write_tag(&mut writer, "altitude", "0")?;
        write_tag(&mut writer, "range", &KML_LOOKAT_RANGE_M.to_string())?;
        write_tag(&mut writer, "tilt", &KML_LOOKAT_TILT.to_string())?;
        write_tag(&mut writer, "heading", "0")?;
        write_tag_end(&mut writer, "LookAt")?;
    }

    for el in &route {
        write_tag_start(&mut writer, "Placemark", &[])?;
        write_tag(&mut writer, "name", &el.display_label())?;
        write_tag(&mut writer, "description", el.element_type.as_str())?;
        write_tag(&mut writer, "styleUrl", &format!("#style-{}", el.element_type))?;
        write_tag_start(&mut writer, "Point", &[])?;
        write_tag(&mut writer, "coordinates", &kml_coord(el.lat, el.lng))?;
        write_tag_end(&mut writer, "Point")?;
        write_tag_end(&mut writer, "Placemark")?;
    }

    if route.len() >= 2 {
        let coords: Vec<String> = route
            .iter()
            .chain(route.first())
            .map(|el| kml_coord(el.lat, el.lng))
            .collect();
        write_tag_start(&mut writer, "Placemark", &[])?;
        write_tag(&mut writer, "name", "Route")?;
        write_tag(&mut writer, "styleUrl", "#route-line")?;
        write_tag_start(&mut writer, "LineString", &[])?;
        write_tag(&mut writer, "tessellate", "1")?;
        write_tag(&mut writer, "coordinates", &coords.join(" "))?;
        write_tag_end(&mut writer, "LineString")?;
        write_tag_end(&mut writer, "Placemark")?;
    }

    let mut zones = 0;
    for zone in course
        .elements
        .iter()
        .filter(|el| el.element_type == ElementType::RescueZone)
    {
        let vertices = parse_vertices(zone.metadata.as_deref());
        if vertices.len() < 3 {
            continue;
        }
        let coords: Vec<String> = vertices
            .iter()
            .chain(vertices.first())
            .map(|v| kml_coord(v.lat, v.lng))
            .collect();
        write_tag_start(&mut writer, "Placemark", &[])?;
        write_tag(&mut writer, "name", zone.label.as_deref().unwrap_or("Rescue Zone"))?;
        write_tag(&mut writer, "styleUrl", "#rescue-zone")?;
        write_tag_start(&mut writer, "Polygon", &[])?;
        write_tag_start(&mut writer, "outerBoundaryIs", &[])?;
        write_tag_start(&mut writer, "LinearRing", &[])?;
        write_tag(&mut writer, "coordinates", &coords.join(" "))?;
        write_tag_end(&mut writer, "LinearRing")?;
        write_tag_end(&mut writer, "outerBoundaryIs")?;
        write_tag_end(&mut writer, "Polygon")?;
        write_tag_end(&mut writer, "Placemark")?;
        zones += 1;
    }

    write_tag_end(&mut writer, "Document")?;
    write_tag_end(&mut writer, "kml")?;

    info!(
        "[Export] KML with {} placemarks, {} rescue zones",
        route.len(),
        zones
    );
    finish_writer(writer)
}

// ============================================================================
// CSV
// ============================================================================

/// CSV coordinate list with header `order,type,label,lat,lng`.
pub fn build_csv(course: &CourseData) -> Result<String> {
    let route = course.route_elements();
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["order", "type", "label", "lat", "lng"])
        .map_err(export_error)?;
    for el in &route {
        writer
            .write_record([
                el.order.to_string(),
                el.element_type.to_string(),
                el.display_label(),
                el.lat.to_string(),
                el.lng.to_string(),
            ])
            .map_err(export_error)?;
    }

    let bytes = writer.into_inner().map_err(export_error)?;
    info!("[Export] CSV with {} rows", route.len());
    String::from_utf8(bytes).map_err(export_error)
}
