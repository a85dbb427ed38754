//! Joining of line and arc segments whose endpoints touch

use super::{Path, Point, EPSILON};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Chains segments sharing endpoints into longer paths
///
/// Closed outlines are extracted first: each segment, in input order, is
/// closed with the shortest chain of unused segments leading from its end
/// back to its start. Segments not part of any outline are then chained
/// greedily in input order. Joining gives up once the timeout elapsed so a
/// footprint with thousands of segments cannot stall the import.
#[derive(Debug, Clone, Copy)]
pub struct TangentPathJoiner {
    timeout: Duration,
}

impl TangentPathJoiner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Joined paths, or `None` if the timeout elapsed
    pub fn join(&self, paths: &[Path]) -> Option<Vec<Path>> {
        let deadline = Instant::now() + self.timeout;
        let segments: Vec<&Path> = paths.iter().filter(|p| p.len() >= 2).collect();
        let graph = SegmentGraph::new(&segments);
        let mut used = vec![false; segments.len()];
        // Keyed by the index of the segment a path starts with
        let mut joined: Vec<(usize, Path)> = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            if Instant::now() >= deadline {
                return None;
            }
            if segment.is_closed() {
                used[i] = true;
                joined.push((i, (*segment).clone()));
                continue;
            }
            let Some(cycle) = graph.shortest_cycle(i, &used) else {
                continue;
            };
            let mut outline = (*segment).clone();
            used[i] = true;
            for (edge, forward) in cycle {
                used[edge] = true;
                if forward {
                    outline.append(segments[edge]);
                } else {
                    outline.append(&segments[edge].reversed());
                }
            }
            joined.push((i, outline));
        }

        let mut remaining: Vec<(usize, Path)> = segments
            .iter()
            .enumerate()
            .filter(|(i, _)| !used[*i])
            .map(|(i, p)| (i, (*p).clone()))
            .collect();
        remaining.reverse();
        while let Some((key, mut current)) = remaining.pop() {
            while !current.is_closed() {
                if Instant::now() >= deadline {
                    return None;
                }
                if !extend_path(&mut current, &mut remaining) {
                    break;
                }
            }
            joined.push((key, current));
        }

        joined.sort_by_key(|(key, _)| *key);
        Some(joined.into_iter().map(|(_, path)| path).collect())
    }
}

/// Endpoint adjacency of the segments to join
struct SegmentGraph {
    /// Start and end node of each segment
    ends: Vec<(usize, usize)>,
    /// Segments touching each node
    adjacent: Vec<Vec<usize>>,
}

impl SegmentGraph {
    fn new(segments: &[&Path]) -> Self {
        let mut nodes: HashMap<(i64, i64), usize> = HashMap::new();
        let mut adjacent: Vec<Vec<usize>> = Vec::new();
        let mut node = |p: Point, adjacent: &mut Vec<Vec<usize>>| {
            let key = ((p.x / EPSILON).round() as i64, (p.y / EPSILON).round() as i64);
            *nodes.entry(key).or_insert_with(|| {
                adjacent.push(Vec::new());
                adjacent.len() - 1
            })
        };
        let mut ends = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let a = node(segment.first_point().unwrap_or_default(), &mut adjacent);
            let b = node(segment.last_point().unwrap_or_default(), &mut adjacent);
            adjacent[a].push(i);
            if b != a {
                adjacent[b].push(i);
            }
            ends.push((a, b));
        }
        Self { ends, adjacent }
    }

    /// Shortest chain of unused segments from the end of `segment` back to
    /// its start, as segment indices with their direction
    fn shortest_cycle(&self, segment: usize, used: &[bool]) -> Option<Vec<(usize, bool)>> {
        let (target, source) = self.ends[segment];
        if target == source {
            return None;
        }
        // Node reached through (segment, previous node)
        let mut reached: Vec<Option<(usize, usize)>> = vec![None; self.adjacent.len()];
        let mut visited = vec![false; self.adjacent.len()];
        let mut queue = VecDeque::from([source]);
        visited[source] = true;
        while let Some(current) = queue.pop_front() {
            if current == target {
                break;
            }
            for &edge in &self.adjacent[current] {
                if edge == segment || used[edge] {
                    continue;
                }
                let (a, b) = self.ends[edge];
                let next = if a == current { b } else { a };
                if !visited[next] {
                    visited[next] = true;
                    reached[next] = Some((edge, current));
                    queue.push_back(next);
                }
            }
        }
        if !visited[target] {
            return None;
        }

        let mut chain = Vec::new();
        let mut node = target;
        while node != source {
            let (edge, previous) = reached[node]?;
            chain.push((edge, self.ends[edge].0 == previous));
            node = previous;
        }
        chain.reverse();
        Some(chain)
    }
}

/// Attach one remaining path to either end of `current`
fn extend_path(current: &mut Path, remaining: &mut Vec<(usize, Path)>) -> bool {
    let (Some(first), Some(last)) = (current.first_point(), current.last_point()) else {
        return false;
    };
    // `remaining` is used as a stack, so search from the back to keep order.
    for i in (0..remaining.len()).rev() {
        let (Some(start), Some(end)) = (remaining[i].1.first_point(), remaining[i].1.last_point())
        else {
            continue;
        };
        if last.approx_eq(start) {
            let next = remaining.remove(i).1;
            current.append(&next);
            return true;
        }
        if last.approx_eq(end) {
            let next = remaining.remove(i).1.reversed();
            current.append(&next);
            return true;
        }
        if first.approx_eq(end) {
            let mut previous = remaining.remove(i).1;
            previous.append(current);
            *current = previous;
            return true;
        }
        if first.approx_eq(start) {
            let mut previous = remaining.remove(i).1.reversed();
            previous.append(current);
            *current = previous;
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Angle, Point};

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Path {
        Path::line(Point::new(x1, y1), Point::new(x2, y2), Angle::ZERO)
    }

    #[test]
    fn test_join_closed_rectangle() {
        let segments = vec![
            line(0.0, 0.0, 1.0, 0.0),
            line(1.0, 1.0, 1.0, 0.0),
            line(0.0, 1.0, 0.0, 0.0),
            line(1.0, 1.0, 0.0, 1.0),
        ];
        let joined = TangentPathJoiner::new(Duration::from_secs(5))
            .join(&segments)
            .unwrap();
        assert_eq!(joined.len(), 1);
        assert!(joined[0].is_closed());
        assert_eq!(joined[0].len(), 5);
    }

    #[test]
    fn test_outline_with_touching_spur() {
        let spur = line(1.0, 0.0, 2.0, 0.0);
        let segments = vec![
            line(0.0, 0.0, 1.0, 0.0),
            spur.clone(),
            line(1.0, 0.0, 1.0, 1.0),
            line(1.0, 1.0, 0.0, 1.0),
            line(0.0, 1.0, 0.0, 0.0),
        ];
        let joined = TangentPathJoiner::new(Duration::from_secs(5))
            .join(&segments)
            .unwrap();
        assert_eq!(joined.len(), 2);
        assert!(joined[0].is_closed());
        assert_eq!(joined[0].len(), 5);
        assert_eq!(joined[1], spur);
    }

    #[test]
    fn test_shared_edge_gives_smallest_outline() {
        let segments = vec![
            Path::from_points([Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 1.0)]),
            line(0.0, 0.0, 1.0, 0.0),
            line(1.0, 0.0, 1.0, 1.0),
            Path::from_points([
                Point::new(1.0, 0.0),
                Point::new(2.0, 0.0),
                Point::new(2.0, 1.0),
                Point::new(1.0, 1.0),
            ]),
        ];
        let joined = TangentPathJoiner::new(Duration::from_secs(5))
            .join(&segments)
            .unwrap();
        assert_eq!(joined.len(), 2);
        assert!(joined[0].is_closed());
        assert_eq!(joined[0].len(), 5);
        assert!(!joined[1].is_closed());
        assert_eq!(joined[1], segments[3]);
    }

    #[test]
    fn test_keep_separate_segments() {
        let segments = vec![line(0.0, 0.0, 1.0, 0.0), line(5.0, 5.0, 6.0, 5.0)];
        let joined = TangentPathJoiner::new(Duration::from_secs(5))
            .join(&segments)
            .unwrap();
        assert_eq!(joined, segments);
    }

    #[test]
    fn test_prepend_and_keep_arc_angle() {
        let arc = Path::line(Point::new(1.0, 0.0), Point::new(0.0, 1.0), Angle::deg(90.0));
        let segments = vec![line(0.0, 1.0, -1.0, 1.0), arc];
        let joined = TangentPathJoiner::new(Duration::from_secs(5))
            .join(&segments)
            .unwrap();
        assert_eq!(joined.len(), 1);
        let vertices = joined[0].vertices();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[0].pos, Point::new(1.0, 0.0));
        assert_eq!(vertices[0].angle, Angle::deg(90.0));
        assert_eq!(vertices[2].pos, Point::new(-1.0, 1.0));
    }

    #[test]
    fn test_timeout() {
        let segments: Vec<Path> = (0..100)
            .map(|i| line(i as f64, 0.0, i as f64 + 1.0, 0.0))
            .collect();
        assert!(TangentPathJoiner::new(Duration::ZERO).join(&segments).is_none());
    }
}
