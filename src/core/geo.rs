//! Geo-Koordinaten und Punkt-auf-Segment-Geometrie.

use super::{GraphError, GraphResult};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Maximaler Abstand (Grad) eines Punkts zu einem Segment, um als "auf dem Weg" zu gelten.
///
/// Entspricht ca. 2 m am Äquator.
pub const DISTANCE_THRESHOLD: f64 = 0.00002;

/// Geografische Position in Grad.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    /// Breitengrad
    pub lat: f64,
    /// Längengrad
    pub lng: f64,
}

impl LatLng {
    /// Erstellt eine Position ohne Bereichsprüfung.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Erstellt eine Position und prüft Wertebereich und Endlichkeit.
    pub fn try_new(lat: f64, lng: f64) -> GraphResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GraphError::InvalidValue {
                field: "lat".to_string(),
                reason: format!("{lat} liegt nicht in [-90, 90]"),
            });
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GraphError::InvalidValue {
                field: "lng".to_string(),
                reason: format!("{lng} liegt nicht in [-180, 180]"),
            });
        }
        Ok(Self { lat, lng })
    }

    /// Planare Projektion (x = Länge skaliert, y = Breite).
    fn projected(self, lng_scale: f64) -> DVec2 {
        DVec2::new(self.lng * lng_scale, self.lat)
    }
}

/// Achsenparalleles Rechteck `[min_lat, max_lat, min_lng, max_lng]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimale Breite
    pub min_lat: f64,
    /// Maximale Breite
    pub max_lat: f64,
    /// Minimale Länge
    pub min_lng: f64,
    /// Maximale Länge
    pub max_lng: f64,
}

impl BoundingBox {
    /// Berechnet die Bounding-Box einer Koordinatenliste.
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lng: first.lng,
            max_lng: first.lng,
        };
        for p in &points[1..] {
            bounds.min_lat = bounds.min_lat.min(p.lat);
            bounds.max_lat = bounds.max_lat.max(p.lat);
            bounds.min_lng = bounds.min_lng.min(p.lng);
            bounds.max_lng = bounds.max_lng.max(p.lng);
        }
        Some(bounds)
    }

    /// Vergrößert die Box in alle Richtungen um `margin` Grad.
    pub fn expanded(self, margin: f64) -> Self {
        Self {
            min_lat: self.min_lat - margin,
            max_lat: self.max_lat + margin,
            min_lng: self.min_lng - margin,
            max_lng: self.max_lng + margin,
        }
    }

    /// Prüft ob der Punkt innerhalb (inkl. Rand) liegt.
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

/// Projektion eines Punkts auf ein Segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Senkrechter Abstand zur Geraden durch das Segment (Grad, längenkorrigiert)
    pub distance: f64,
    /// Parametrische Position des Lotfußpunkts (0 = Start, 1 = Ende)
    pub t: f64,
}

impl SegmentProjection {
    /// Lotfußpunkt liegt auf dem Segment und der Abstand ist innerhalb der Schwelle.
    pub fn is_on_segment(&self, threshold: f64) -> bool {
        self.distance <= threshold && (0.0..=1.0).contains(&self.t)
    }
}

/// Projiziert `point` auf das Segment `start`→`end`.
///
/// Längengrade werden mit `cos(lat)` des Punkts skaliert (Meridian-Konvergenz).
/// Ein entartetes Segment (Start = Ende) liefert `t = 0` und den Abstand zum Startpunkt.
pub fn project_onto_segment(point: LatLng, start: LatLng, end: LatLng) -> SegmentProjection {
    let lng_scale = point.lat.to_radians().cos();
    let p = point.projected(lng_scale);
    let a = start.projected(lng_scale);
    let b = end.projected(lng_scale);

    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return SegmentProjection {
            distance: p.distance(a),
            t: 0.0,
        };
    }

    let t = (p - a).dot(ab) / len_sq;
    let foot = a + ab * t;
    SegmentProjection {
        distance: p.distance(foot),
        t,
    }
}

/// Prüft ob der Punkt auf irgendeinem Segment der Polyline liegt.
pub fn is_point_on_polyline(point: LatLng, coordinates: &[LatLng], threshold: f64) -> bool {
    coordinates
        .windows(2)
        .any(|pair| project_onto_segment(point, pair[0], pair[1]).is_on_segment(threshold))
}

/// Arithmetischer Mittelpunkt einer Koordinatenliste.
pub fn centroid(points: &[LatLng]) -> Option<LatLng> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(DVec2::ZERO, |acc, p| acc + DVec2::new(p.lat, p.lng));
    let mean = sum / points.len() as f64;
    Some(LatLng::new(mean.x, mean.y))
}
