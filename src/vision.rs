use std::collections::HashSet;

/// RGB image stored row-major as one `[r, g, b]` triple per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 3]>,
}

impl PixelImage {
    /// All-black image, mostly useful for health checks and tests.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0]; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        self.pixels[y * self.width + x] = rgb;
    }

    /// Copy of the region with x in `[x0, x1)` and y in `[y0, y1)`,
    /// clamped to the image bounds.
    pub fn crop(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> PixelImage {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        let x0 = x0.min(x1);
        let y0 = y0.min(y1);

        let mut pixels = Vec::with_capacity((x1 - x0) * (y1 - y0));
        for y in y0..y1 {
            for x in x0..x1 {
                pixels.push(self.get(x, y));
            }
        }

        PixelImage {
            width: x1 - x0,
            height: y1 - y0,
            pixels,
        }
    }
}

/// Single-channel image with values 0-255.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Binary image: values above the threshold become 255, the rest 0.
    pub fn threshold(&self, threshold: u8) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&v| if v > threshold { 255 } else { 0 })
                .collect(),
        }
    }
}

/// Pixel in HSV space. Hue is scaled to 0-179, saturation and value to 0-255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Closed boundary of a connected region, as traced pixel coordinates.
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    /// Enclosed area via the shoelace formula over the boundary polygon.
    pub fn area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut sum = 0i64;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            sum += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        (sum.abs() as f64) / 2.0
    }

    /// Length of the closed boundary polyline.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }

        let mut length = 0.0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            let dx = (a.x - b.x) as f64;
            let dy = (a.y - b.y) as f64;
            length += (dx * dx + dy * dy).sqrt();
        }
        length
    }

    pub fn bounding_box(&self) -> Rect {
        if self.points.is_empty() {
            return Rect {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            };
        }

        let min_x = self.points.iter().map(|p| p.x).min().unwrap();
        let max_x = self.points.iter().map(|p| p.x).max().unwrap();
        let min_y = self.points.iter().map(|p| p.y).min().unwrap();
        let max_y = self.points.iter().map(|p| p.y).max().unwrap();

        Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }
}

/// Low-level image operations behind the screenshot analyzer.
///
/// The bundled `SoftwareVision` covers every operation in pure Rust; an
/// alternative backend can swap in without touching the analyzer itself.
pub trait VisionProvider: Send + Sync {
    fn grayscale(&self, image: &PixelImage) -> GrayImage;

    /// Binary edge map of a grayscale image.
    fn detect_edges(&self, gray: &GrayImage) -> GrayImage;

    /// Outer boundaries of the connected regions in a binary image.
    fn find_contours(&self, edges: &GrayImage) -> Vec<Contour>;

    /// Simplified polygon for a contour. A rectangle comes back as 4 points.
    fn approx_polygon(&self, contour: &Contour) -> Vec<Point>;

    fn hsv_pixels(&self, image: &PixelImage) -> Vec<Hsv>;

    /// The k most dominant colors, deterministic for a given image.
    fn dominant_colors(&self, image: &PixelImage, k: usize) -> Vec<[u8; 3]>;
}

/// Pure-Rust vision backend: Sobel edges, Moore boundary tracing,
/// Douglas-Peucker simplification and seeded k-means.
pub struct SoftwareVision;

const EDGE_THRESHOLD: f64 = 100.0;
const KMEANS_MAX_ITERATIONS: usize = 20;

// Clockwise in screen coordinates, starting east.
const TRACE_DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

impl SoftwareVision {
    fn trace_boundary(component: &HashSet<(i32, i32)>, start: (i32, i32)) -> Vec<Point> {
        let mut contour = vec![Point {
            x: start.0,
            y: start.1,
        }];
        let mut current = start;
        // Scanning order guarantees the pixel west of the start is empty.
        let mut backtrack = 4;
        let max_steps = component.len() * 8 + 8;
        let mut steps = 0;

        loop {
            let mut advanced = false;
            for i in 1..=8 {
                let dir = (backtrack + i) % 8;
                let next = (current.0 + TRACE_DIRS[dir].0, current.1 + TRACE_DIRS[dir].1);
                if component.contains(&next) {
                    backtrack = (dir + 6) % 8;
                    current = next;
                    advanced = true;
                    break;
                }
            }

            if !advanced || current == start {
                break;
            }
            contour.push(Point {
                x: current.0,
                y: current.1,
            });

            steps += 1;
            if steps > max_steps {
                break;
            }
        }

        contour
    }

    fn line_distance(point: Point, a: Point, b: Point) -> f64 {
        let dx = (b.x - a.x) as f64;
        let dy = (b.y - a.y) as f64;
        let length = (dx * dx + dy * dy).sqrt();
        if length == 0.0 {
            let px = (point.x - a.x) as f64;
            let py = (point.y - a.y) as f64;
            return (px * px + py * py).sqrt();
        }

        let cross = dx * (point.y - a.y) as f64 - dy * (point.x - a.x) as f64;
        cross.abs() / length
    }

    fn rdp(points: &[Point], epsilon: f64, out: &mut Vec<Point>) {
        if points.len() < 3 {
            out.extend_from_slice(points);
            return;
        }

        let first = points[0];
        let last = points[points.len() - 1];
        let mut max_distance = 0.0;
        let mut max_index = 0;
        for (i, &p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
            let distance = Self::line_distance(p, first, last);
            if distance > max_distance {
                max_distance = distance;
                max_index = i;
            }
        }

        if max_distance > epsilon {
            Self::rdp(&points[..=max_index], epsilon, out);
            out.pop();
            Self::rdp(&points[max_index..], epsilon, out);
        } else {
            out.push(first);
            out.push(last);
        }
    }

    fn squared_distance(a: [f64; 3], b: [u8; 3]) -> f64 {
        let dr = a[0] - b[0] as f64;
        let dg = a[1] - b[1] as f64;
        let db = a[2] - b[2] as f64;
        dr * dr + dg * dg + db * db
    }
}

impl VisionProvider for SoftwareVision {
    fn grayscale(&self, image: &PixelImage) -> GrayImage {
        let data = image
            .pixels
            .iter()
            .map(|&[r, g, b]| {
                ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
            })
            .collect();

        GrayImage {
            width: image.width,
            height: image.height,
            data,
        }
    }

    fn detect_edges(&self, gray: &GrayImage) -> GrayImage {
        let mut data = vec![0u8; gray.width * gray.height];
        if gray.width < 3 || gray.height < 3 {
            return GrayImage {
                width: gray.width,
                height: gray.height,
                data,
            };
        }

        for y in 1..gray.height - 1 {
            for x in 1..gray.width - 1 {
                let p = |dx: i32, dy: i32| {
                    gray.get((x as i32 + dx) as usize, (y as i32 + dy) as usize) as i32
                };

                let gx = -p(-1, -1) + p(1, -1) - 2 * p(-1, 0) + 2 * p(1, 0) - p(-1, 1) + p(1, 1);
                let gy = -p(-1, -1) - 2 * p(0, -1) - p(1, -1) + p(-1, 1) + 2 * p(0, 1) + p(1, 1);

                let magnitude = ((gx * gx + gy * gy) as f64).sqrt();
                if magnitude > EDGE_THRESHOLD {
                    data[y * gray.width + x] = 255;
                }
            }
        }

        GrayImage {
            width: gray.width,
            height: gray.height,
            data,
        }
    }

    fn find_contours(&self, edges: &GrayImage) -> Vec<Contour> {
        let mut visited = vec![false; edges.width * edges.height];
        let mut contours = Vec::new();

        for y in 0..edges.height {
            for x in 0..edges.width {
                let index = y * edges.width + x;
                if visited[index] || edges.data[index] == 0 {
                    continue;
                }

                // Flood-fill the 8-connected component.
                let mut component = HashSet::new();
                let mut queue = vec![(x as i32, y as i32)];
                visited[index] = true;
                while let Some((cx, cy)) = queue.pop() {
                    component.insert((cx, cy));
                    for (dx, dy) in TRACE_DIRS {
                        let (nx, ny) = (cx + dx, cy + dy);
                        if nx < 0 || ny < 0 || nx >= edges.width as i32 || ny >= edges.height as i32
                        {
                            continue;
                        }
                        let neighbor = ny as usize * edges.width + nx as usize;
                        if !visited[neighbor] && edges.data[neighbor] > 0 {
                            visited[neighbor] = true;
                            queue.push((nx, ny));
                        }
                    }
                }

                contours.push(Contour {
                    points: Self::trace_boundary(&component, (x as i32, y as i32)),
                });
            }
        }

        contours
    }

    fn approx_polygon(&self, contour: &Contour) -> Vec<Point> {
        let points = &contour.points;
        if points.len() < 3 {
            return points.clone();
        }

        let epsilon = 0.02 * contour.perimeter();

        // Split the closed boundary at the point farthest from the start,
        // then simplify each half.
        let anchor = points[0];
        let mut far_index = 0;
        let mut far_distance = 0.0;
        for (i, &p) in points.iter().enumerate() {
            let dx = (p.x - anchor.x) as f64;
            let dy = (p.y - anchor.y) as f64;
            let distance = dx * dx + dy * dy;
            if distance > far_distance {
                far_distance = distance;
                far_index = i;
            }
        }
        if far_index == 0 {
            return vec![anchor];
        }

        let mut first_half = Vec::new();
        Self::rdp(&points[..=far_index], epsilon, &mut first_half);

        let mut wrapped: Vec<Point> = points[far_index..].to_vec();
        wrapped.push(anchor);
        let mut second_half = Vec::new();
        Self::rdp(&wrapped, epsilon, &mut second_half);

        // Join the halves without repeating the shared endpoints.
        let mut polygon = first_half;
        if second_half.len() > 2 {
            polygon.extend_from_slice(&second_half[1..second_half.len() - 1]);
        }
        polygon
    }

    fn hsv_pixels(&self, image: &PixelImage) -> Vec<Hsv> {
        image
            .pixels
            .iter()
            .map(|&[r, g, b]| {
                let max = r.max(g).max(b);
                let min = r.min(g).min(b);
                let delta = (max - min) as f64;

                let v = max;
                let s = if max == 0 {
                    0
                } else {
                    (delta * 255.0 / max as f64).round() as u8
                };

                let h = if delta == 0.0 {
                    0.0
                } else if max == r {
                    60.0 * (((g as f64 - b as f64) / delta) % 6.0)
                } else if max == g {
                    60.0 * ((b as f64 - r as f64) / delta + 2.0)
                } else {
                    60.0 * ((r as f64 - g as f64) / delta + 4.0)
                };
                let h = if h < 0.0 { h + 360.0 } else { h };

                Hsv {
                    h: (h / 2.0).round().min(179.0) as u8,
                    s,
                    v,
                }
            })
            .collect()
    }

    fn dominant_colors(&self, image: &PixelImage, k: usize) -> Vec<[u8; 3]> {
        let pixels = &image.pixels;
        if pixels.is_empty() || k == 0 {
            return Vec::new();
        }
        let k = k.min(pixels.len());

        // Stride-spaced seeds keep the clustering fully deterministic.
        let mut centers: Vec<[f64; 3]> = (0..k)
            .map(|i| {
                let [r, g, b] = pixels[i * pixels.len() / k];
                [r as f64, g as f64, b as f64]
            })
            .collect();

        let mut assignments = vec![0usize; pixels.len()];
        for _ in 0..KMEANS_MAX_ITERATIONS {
            let mut changed = false;
            for (pixel_index, &pixel) in pixels.iter().enumerate() {
                let mut best = 0;
                let mut best_distance = f64::MAX;
                for (center_index, &center) in centers.iter().enumerate() {
                    let distance = Self::squared_distance(center, pixel);
                    if distance < best_distance {
                        best_distance = distance;
                        best = center_index;
                    }
                }
                if assignments[pixel_index] != best {
                    assignments[pixel_index] = best;
                    changed = true;
                }
            }

            let mut sums = vec![[0.0f64; 3]; k];
            let mut counts = vec![0usize; k];
            for (pixel_index, &pixel) in pixels.iter().enumerate() {
                let cluster = assignments[pixel_index];
                sums[cluster][0] += pixel[0] as f64;
                sums[cluster][1] += pixel[1] as f64;
                sums[cluster][2] += pixel[2] as f64;
                counts[cluster] += 1;
            }
            for cluster in 0..k {
                if counts[cluster] > 0 {
                    centers[cluster] = [
                        sums[cluster][0] / counts[cluster] as f64,
                        sums[cluster][1] / counts[cluster] as f64,
                        sums[cluster][2] / counts[cluster] as f64,
                    ];
                }
            }

            if !changed {
                break;
            }
        }

        centers
            .iter()
            .map(|c| {
                [
                    c[0].round().clamp(0.0, 255.0) as u8,
                    c[1].round().clamp(0.0, 255.0) as u8,
                    c[2].round().clamp(0.0, 255.0) as u8,
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_rect(image: &mut PixelImage, x0: usize, y0: usize, x1: usize, y1: usize, rgb: [u8; 3]) {
        for y in y0..y1 {
            for x in x0..x1 {
                image.set(x, y, rgb);
            }
        }
    }

    #[test]
    fn test_grayscale_luma_weights() {
        let image = PixelImage {
            width: 3,
            height: 1,
            pixels: vec![[255, 0, 0], [0, 255, 0], [255, 255, 255]],
        };
        let gray = SoftwareVision.grayscale(&image);
        assert_eq!(gray.data, vec![76, 149, 255]);
    }

    #[test]
    fn test_threshold_binarizes() {
        let gray = GrayImage {
            width: 4,
            height: 1,
            data: vec![10, 127, 128, 250],
        };
        assert_eq!(gray.threshold(127).data, vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_edges_blank_image_empty() {
        let gray = SoftwareVision.grayscale(&PixelImage::blank(20, 20));
        let edges = SoftwareVision.detect_edges(&gray);
        assert!(edges.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_square_contour_is_rectangle() {
        let mut image = PixelImage::blank(40, 40);
        draw_rect(&mut image, 5, 5, 25, 25, [255, 255, 255]);

        let vision = SoftwareVision;
        let gray = vision.grayscale(&image);
        let edges = vision.detect_edges(&gray);
        let contours = vision.find_contours(&edges);
        assert_eq!(contours.len(), 1);

        let polygon = vision.approx_polygon(&contours[0]);
        assert_eq!(polygon.len(), 4);

        let area = contours[0].area();
        assert!(area > 300.0 && area < 600.0, "area was {}", area);

        let bounds = contours[0].bounding_box();
        assert!(bounds.width >= 20 && bounds.width <= 24);
        assert!(bounds.height >= 20 && bounds.height <= 24);
    }

    #[test]
    fn test_two_separate_squares_two_contours() {
        let mut image = PixelImage::blank(60, 30);
        draw_rect(&mut image, 4, 4, 20, 20, [255, 255, 255]);
        draw_rect(&mut image, 34, 4, 50, 20, [255, 255, 255]);

        let vision = SoftwareVision;
        let edges = vision.detect_edges(&vision.grayscale(&image));
        assert_eq!(vision.find_contours(&edges).len(), 2);
    }

    #[test]
    fn test_approx_polygon_collapses_straight_edges() {
        let mut points = Vec::new();
        for x in 0..30 {
            points.push(Point { x, y: 0 });
        }
        for y in 0..20 {
            points.push(Point { x: 29, y });
        }
        for x in (0..30).rev() {
            points.push(Point { x, y: 19 });
        }
        for y in (1..20).rev() {
            points.push(Point { x: 0, y });
        }

        let polygon = SoftwareVision.approx_polygon(&Contour { points });
        assert_eq!(polygon.len(), 4);
    }

    #[test]
    fn test_shoelace_area_and_perimeter() {
        let contour = Contour {
            points: vec![
                Point { x: 0, y: 0 },
                Point { x: 10, y: 0 },
                Point { x: 10, y: 10 },
                Point { x: 0, y: 10 },
            ],
        };
        assert_eq!(contour.area(), 100.0);
        assert_eq!(contour.perimeter(), 40.0);
        assert_eq!(
            contour.bounding_box(),
            Rect {
                x: 0,
                y: 0,
                width: 11,
                height: 11
            }
        );
    }

    #[test]
    fn test_hsv_saturation_and_value() {
        let image = PixelImage {
            width: 3,
            height: 1,
            pixels: vec![[255, 0, 0], [128, 128, 128], [0, 0, 0]],
        };
        let hsv = SoftwareVision.hsv_pixels(&image);
        assert_eq!(hsv[0].s, 255);
        assert_eq!(hsv[0].v, 255);
        assert_eq!(hsv[1].s, 0);
        assert_eq!(hsv[1].v, 128);
        assert_eq!(hsv[2].v, 0);
    }

    #[test]
    fn test_dominant_colors_two_halves() {
        let mut image = PixelImage::blank(10, 10);
        draw_rect(&mut image, 0, 0, 10, 5, [250, 0, 0]);
        draw_rect(&mut image, 0, 5, 10, 10, [0, 0, 250]);

        let colors = SoftwareVision.dominant_colors(&image, 2);
        assert_eq!(colors.len(), 2);
        assert!(colors.contains(&[250, 0, 0]));
        assert!(colors.contains(&[0, 0, 250]));
    }

    #[test]
    fn test_dominant_colors_deterministic() {
        let mut image = PixelImage::blank(16, 16);
        draw_rect(&mut image, 0, 0, 8, 16, [200, 30, 40]);
        draw_rect(&mut image, 8, 0, 16, 8, [10, 220, 50]);

        let vision = SoftwareVision;
        assert_eq!(
            vision.dominant_colors(&image, 3),
            vision.dominant_colors(&image, 3)
        );
    }

    #[test]
    fn test_crop_region() {
        let mut image = PixelImage::blank(8, 8);
        image.set(3, 2, [9, 9, 9]);

        let cropped = image.crop(2, 2, 6, 5);
        assert_eq!(cropped.width, 4);
        assert_eq!(cropped.height, 3);
        assert_eq!(cropped.get(1, 0), [9, 9, 9]);
    }
}
