use std::collections::VecDeque;

use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};

use crate::params::{Parameters, RetentionMode};

/// Opacity below which a faded link is no longer worth keeping. It sits just
/// under one step of an 8-bit alpha channel.
pub const FADE_THRESHOLD: f64 = 1.0 / 256.0;

/// Segment between two consecutive generated points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub from: Point,
    pub to: Point,
    /// Accumulated generator angle (radians) at which `to` was produced.
    pub angle: f64,
    /// Trail tick on which the link was appended.
    pub born: u64,
}

impl Link {
    pub fn line(&self) -> Line {
        Line::new(self.from, self.to)
    }
}

/// Link paired with the opacity the retention policy assigns to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedLink {
    pub line: Line,
    pub weight: f64,
}

/// Retention strategy applied at the trail boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep the newest `max_links` links at full opacity.
    Cutoff { max_links: u32 },
    /// Weight links by age; a link fades out over `link_length` ticks.
    Fade { link_length: u32 },
}

impl RetentionPolicy {
    pub fn from_params(params: &Parameters) -> Self {
        match params.retention() {
            RetentionMode::Cutoff => Self::Cutoff {
                max_links: params.link_length(),
            },
            RetentionMode::Fade => Self::Fade {
                link_length: params.link_length(),
            },
        }
    }

    /// Render weight of a link of the given age.
    pub fn weight(&self, age: u64) -> f64 {
        match *self {
            Self::Cutoff { .. } => 1.0,
            Self::Fade { link_length } => fade_weight(age, link_length),
        }
    }
}

/// Exponential falloff `threshold^(age / link_length)`: 1.0 for a new link,
/// exactly the threshold once the link is `link_length` ticks old.
pub fn fade_weight(age: u64, link_length: u32) -> f64 {
    let span = f64::from(link_length.max(1));
    FADE_THRESHOLD.powf(age as f64 / span)
}

/// Ordered, bounded history of links, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Trail {
    links: VecDeque<Link>,
    head: Option<Point>,
    tick: u64,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh trail whose first link will begin at `origin`.
    pub fn seeded(origin: Point) -> Self {
        Self {
            links: VecDeque::new(),
            head: Some(origin),
            tick: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Number of ticks appended since the trail was created.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Most recently generated point.
    pub fn head(&self) -> Option<Point> {
        self.head
    }

    pub fn links(&self) -> impl ExactSizeIterator<Item = &Link> + '_ {
        self.links.iter()
    }

    pub fn age_of(&self, link: &Link) -> u64 {
        self.tick.saturating_sub(link.born)
    }

    /// Appends the link ending at `point`, ages the existing links by one
    /// tick and applies the policy's drop rule.
    pub fn advance(&mut self, point: Point, angle: f64, policy: RetentionPolicy) {
        self.tick += 1;
        if let Some(from) = self.head {
            self.links.push_back(Link {
                from,
                to: point,
                angle,
                born: self.tick,
            });
        }
        self.head = Some(point);
        self.retain(policy);
    }

    /// Drops links the policy no longer keeps. Links are ordered by age, so
    /// only the front of the queue needs inspecting.
    pub fn retain(&mut self, policy: RetentionPolicy) {
        match policy {
            RetentionPolicy::Cutoff { max_links } => {
                let max_links = max_links as usize;
                while self.links.len() > max_links {
                    self.links.pop_front();
                }
            }
            RetentionPolicy::Fade { link_length } => {
                let link_length = u64::from(link_length.max(1));
                while let Some(oldest) = self.links.front() {
                    if self.age_of(oldest) <= link_length {
                        break;
                    }
                    self.links.pop_front();
                }
            }
        }
    }

    /// Removes every link but keeps the head, so drawing resumes from the
    /// current position.
    pub fn clear(&mut self) {
        self.links.clear();
    }

    /// Links with their current weights under `policy`.
    pub fn snapshot(&self, policy: RetentionPolicy) -> Vec<WeightedLink> {
        self.links
            .iter()
            .map(|link| WeightedLink {
                line: link.line(),
                weight: policy.weight(self.age_of(link)),
            })
            .collect()
    }
}
