//! Utility Predictor Module
//!
//! One small online logistic model per key. Each read is an observed outcome
//! (hit or miss); the model predicts the probability that keeping the key cached
//! pays off and is corrected by a single gradient step after every outcome.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::cache::{Context, MAX_TTL};

/// Prediction returned when no model exists yet, or when a score is unusable.
const NEUTRAL_PREDICTION: f64 = 0.5;

const INITIAL_LEARNING_RATE: f64 = 0.01;
const MIN_LEARNING_RATE: f64 = 0.001;
const MAX_LEARNING_RATE: f64 = 0.1;

/// Number of most recent records scored for accuracy.
const ACCURACY_WINDOW: usize = 50;
/// Records required before accuracy is recomputed.
const MIN_ACCURACY_SAMPLES: usize = 10;

const HIGH_ACCURACY: f64 = 0.8;
const LOW_ACCURACY: f64 = 0.6;

// == Feature Vector ==
/// Features extracted for one read of one key.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    /// 0–23
    pub hour_of_day: u32,
    /// 0–6, Monday = 0
    pub day_of_week: u32,
    /// Stable hash of the key, 0–999
    pub key_hash: u32,
    /// Number of context fields supplied with the read
    pub context_size: usize,
    /// Mean TTL recorded in the key's model history, 0 when empty
    pub avg_ttl: f64,
    /// Accesses per second, 0 when unknown
    pub access_frequency: f64,
}

impl FeatureVector {
    /// Named model inputs, each mapped onto a bounded scale so a single
    /// gradient step cannot blow the score up.
    pub fn model_inputs(&self) -> [(&'static str, f64); 6] {
        [
            ("hour_of_day", f64::from(self.hour_of_day) / 23.0),
            ("day_of_week", f64::from(self.day_of_week) / 6.0),
            ("key_hash", f64::from(self.key_hash) / 1000.0),
            ("context_size", finite_or_zero((self.context_size as f64).ln_1p())),
            ("avg_ttl", finite_or_zero(self.avg_ttl / MAX_TTL as f64)),
            ("access_frequency", finite_or_zero(self.access_frequency.max(0.0).ln_1p())),
        ]
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Deterministic across processes and platforms, unlike `DefaultHasher` seeds.
fn stable_key_hash(key: &str) -> u32 {
    key.bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(31).wrapping_add(u32::from(byte)))
        % 1000
}

fn sigmoid(score: f64) -> f64 {
    1.0 / (1.0 + (-score).exp())
}

// == Training Record ==
/// One observed outcome kept in a model's history.
#[derive(Debug, Clone)]
pub struct TrainingRecord {
    pub features: FeatureVector,
    /// 1.0 for a hit, 0.0 for a miss
    pub target: f64,
    /// Prediction made before the update
    pub prediction: f64,
    /// TTL in effect for the key when the outcome was observed
    pub ttl: u64,
}

impl TrainingRecord {
    fn is_correct(&self) -> bool {
        (self.prediction >= 0.5) == (self.target >= 0.5)
    }
}

// == Learning Model ==
/// Online logistic regression over [`FeatureVector::model_inputs`].
#[derive(Debug, Clone)]
pub struct LearningModel {
    pub weights: HashMap<&'static str, f64>,
    pub bias: f64,
    pub history: VecDeque<TrainingRecord>,
    pub learning_rate: f64,
    /// Fraction of correct predictions over the recent history window
    pub accuracy: f64,
}

impl Default for LearningModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningModel {
    pub fn new() -> Self {
        Self {
            weights: HashMap::new(),
            bias: 0.0,
            history: VecDeque::new(),
            learning_rate: INITIAL_LEARNING_RATE,
            accuracy: NEUTRAL_PREDICTION,
        }
    }

    /// `sigmoid(bias + Σ weight[f] * x[f])`, features without a weight contribute 0.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let score = features
            .model_inputs()
            .iter()
            .fold(self.bias, |acc, (name, x)| {
                acc + self.weights.get(name).copied().unwrap_or(0.0) * x
            });
        let prediction = sigmoid(score);
        if prediction.is_finite() {
            prediction
        } else {
            NEUTRAL_PREDICTION
        }
    }

    /// Mean TTL over the history, 0 when empty.
    pub fn avg_ttl(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().map(|r| r.ttl as f64).sum::<f64>() / self.history.len() as f64
    }

    /// Applies one gradient step for an observed outcome.
    ///
    /// Returns the prediction made before the step.
    pub fn train(&mut self, features: FeatureVector, target: f64, ttl: u64, window: usize) -> f64 {
        let prediction = self.predict(&features);
        let error = target - prediction;
        let lr = self.learning_rate;

        self.bias += lr * error;
        for (name, x) in features.model_inputs() {
            *self.weights.entry(name).or_insert(0.0) += lr * error * x;
        }

        self.history.push_back(TrainingRecord {
            features,
            target,
            prediction,
            ttl,
        });
        while self.history.len() > window.max(1) {
            self.history.pop_front();
        }

        if self.history.len() >= MIN_ACCURACY_SAMPLES {
            self.accuracy = self.recent_accuracy();
            if self.accuracy > HIGH_ACCURACY {
                self.learning_rate *= 0.95;
            } else if self.accuracy < LOW_ACCURACY {
                self.learning_rate *= 1.05;
            }
            self.learning_rate = self.learning_rate.clamp(MIN_LEARNING_RATE, MAX_LEARNING_RATE);
        }

        prediction
    }

    fn recent_accuracy(&self) -> f64 {
        let recent: Vec<&TrainingRecord> =
            self.history.iter().rev().take(ACCURACY_WINDOW).collect();
        let correct = recent.iter().filter(|r| r.is_correct()).count();
        correct as f64 / recent.len() as f64
    }
}

// == Utility Predictor ==
/// Learning models for every key observed by the engine.
///
/// Models survive eviction of their key's entry and are only dropped by
/// [`clear`](UtilityPredictor::clear).
#[derive(Debug)]
pub struct UtilityPredictor {
    models: HashMap<String, LearningModel>,
    learning_window: usize,
}

impl UtilityPredictor {
    pub fn new(learning_window: usize) -> Self {
        Self {
            models: HashMap::new(),
            learning_window: learning_window.max(1),
        }
    }

    // == Extract Features ==
    pub fn extract_features(
        &self,
        key: &str,
        context: &Context,
        now: DateTime<Utc>,
        access_frequency: f64,
    ) -> FeatureVector {
        FeatureVector {
            hour_of_day: now.hour(),
            day_of_week: now.weekday().num_days_from_monday(),
            key_hash: stable_key_hash(key),
            context_size: context.len(),
            avg_ttl: self.models.get(key).map_or(0.0, LearningModel::avg_ttl),
            access_frequency: finite_or_zero(access_frequency),
        }
    }

    // == Predict ==
    /// Utility of `key` for the given features; 0.5 until a model exists.
    pub fn predict(&self, key: &str, features: &FeatureVector) -> f64 {
        self.models
            .get(key)
            .map_or(NEUTRAL_PREDICTION, |model| model.predict(features))
    }

    /// Extracts features and predicts in one step.
    pub fn predict_utility(
        &self,
        key: &str,
        context: &Context,
        now: DateTime<Utc>,
        access_frequency: f64,
    ) -> f64 {
        let features = self.extract_features(key, context, now, access_frequency);
        self.predict(key, &features)
    }

    // == Update ==
    /// Trains `key`'s model on one outcome, creating the model if needed.
    ///
    /// Returns the prediction made before the update.
    pub fn update(
        &mut self,
        key: &str,
        context: &Context,
        was_hit: bool,
        now: DateTime<Utc>,
        access_frequency: f64,
        ttl: u64,
    ) -> f64 {
        let features = self.extract_features(key, context, now, access_frequency);
        let target = if was_hit { 1.0 } else { 0.0 };
        let window = self.learning_window;
        self.models
            .entry(key.to_string())
            .or_default()
            .train(features, target, ttl, window)
    }

    pub fn model(&self, key: &str) -> Option<&LearningModel> {
        self.models.get(key)
    }

    /// Mean accuracy across all models, 0 without models.
    pub fn average_accuracy(&self) -> f64 {
        if self.models.is_empty() {
            return 0.0;
        }
        self.models.values().map(|m| m.accuracy).sum::<f64>() / self.models.len() as f64
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }
}
