//! Seeded swap workload driver
//!
//! Drives a population of funded actors through random create / complete /
//! cancel calls against an [`OperationLedger`] backed by an in-memory
//! [`AssetBank`]. Every account id and every choice is drawn from one
//! ChaCha8 stream, so a seed fully determines the run. Custody conservation
//! is audited after every step.

use crate::metrics::{SimAction, SimMetrics};
use escrow::bank::{AssetBank, BankTransferProvider};
use escrow::config::LedgerConfig;
use escrow::errors::{ConfigError, LedgerError};
use escrow::OperationLedger;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, info};
use types::ids::{AccountId, AssetId, OperationId};
use types::numeric::Amount;
use uuid::Uuid;

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub seed: u64,
    pub actors: usize,
    pub steps: usize,
    /// Asset symbols allowlisted at construction.
    pub assets: Vec<String>,
    /// Minted to every actor in every asset, and approved to custody.
    pub initial_balance: u64,
    /// Upper bound (inclusive) for offered amounts. Zero is drawn too.
    pub max_amount: u64,
    /// Probability that a cancel attempt comes from the operation's creator.
    pub creator_cancel_ratio: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            actors: 8,
            steps: 1_000,
            assets: vec!["BTC".into(), "ETH".into(), "USDT".into()],
            initial_balance: 1_000_000,
            max_amount: 1_000,
            creator_cancel_ratio: 0.7,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_string(),
            })
        };
        if self.actors < 2 {
            return invalid("simulation needs at least two actors");
        }
        if self.assets.len() < 2 {
            return invalid("simulation needs at least two assets");
        }
        if !(0.0..=1.0).contains(&self.creator_cancel_ratio) {
            return invalid("creator_cancel_ratio must be within [0, 1]");
        }
        Ok(())
    }
}

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub seed: u64,
    pub metrics: SimMetrics,
    /// Hex-encoded ledger state root.
    pub state_root: String,
    pub operation_count: u64,
    pub active_operations: usize,
}

impl SimReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub struct SwapSimulation {
    config: SimConfig,
    rng: ChaCha8Rng,
    bank: Rc<AssetBank>,
    ledger: OperationLedger,
    actors: Vec<AccountId>,
    assets: Vec<AssetId>,
    metrics: SimMetrics,
}

impl SwapSimulation {
    /// Build the ledger, allowlist the configured assets and fund every actor.
    pub fn new(config: SimConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let owner = seeded_account(&mut rng);
        let custody = seeded_account(&mut rng);
        let bank = Rc::new(AssetBank::new());
        let provider = Rc::new(BankTransferProvider::new(bank.clone(), custody));
        let ledger_config =
            LedgerConfig::new(owner).with_assets(config.assets.iter().map(String::as_str));
        let ledger = OperationLedger::from_config(ledger_config, provider)?;

        let assets = ledger.list_assets();
        let funding = Amount::from_u64(config.initial_balance);
        let mut actors = Vec::with_capacity(config.actors);
        for _ in 0..config.actors {
            let actor = seeded_account(&mut rng);
            for asset in &assets {
                bank.mint(actor, asset, funding)?;
                bank.approve(actor, custody, asset, funding);
            }
            actors.push(actor);
        }

        info!(
            seed = config.seed,
            actors = config.actors,
            assets = assets.len(),
            "Simulation initialized"
        );

        Ok(Self {
            config,
            rng,
            bank,
            ledger,
            actors,
            assets,
            metrics: SimMetrics::new(),
        })
    }

    /// Run the configured number of steps. Stops at the first failed audit.
    pub fn run(&mut self) -> Result<SimReport, LedgerError> {
        let start = Instant::now();
        for _ in 0..self.config.steps {
            self.step()?;
        }
        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.metrics.set_elapsed(elapsed);
        info!(summary = %self.metrics.summary(), "Simulation finished");
        Ok(self.report())
    }

    /// Perform one random ledger call, then audit custody.
    pub fn step(&mut self) -> Result<(), LedgerError> {
        let roll = self.rng.gen_range(0..100u32);
        if roll < 50 {
            self.create();
        } else if roll < 80 {
            self.complete();
        } else {
            self.cancel();
        }

        self.ledger.audit_custody()?;
        self.metrics.record_audit();
        Ok(())
    }

    pub fn report(&self) -> SimReport {
        SimReport {
            seed: self.config.seed,
            metrics: self.metrics.clone(),
            state_root: hex::encode(self.ledger.state_root()),
            operation_count: self.ledger.get_operation_count(),
            active_operations: self.ledger.active_operations().len(),
        }
    }

    pub fn ledger(&self) -> &OperationLedger {
        &self.ledger
    }

    pub fn bank(&self) -> &AssetBank {
        &self.bank
    }

    pub fn actors(&self) -> &[AccountId] {
        &self.actors
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    fn create(&mut self) {
        let creator = self.pick_actor();
        let token_a = self.pick_asset();
        let token_b = self.pick_asset();
        let amount_a = Amount::from_u64(self.rng.gen_range(0..=self.config.max_amount));
        let amount_b = Amount::from_u64(self.rng.gen_range(0..=self.config.max_amount));

        let result = self
            .ledger
            .create_operation(&creator, &token_a, &token_b, amount_a, amount_b);
        if let Err(err) = &result {
            debug!(creator = %creator, error = %err, "Create rejected");
        }
        self.metrics.record(SimAction::Create, &result);
    }

    fn complete(&mut self) {
        let id = self.pick_operation();
        let caller = self.pick_actor();

        let result = self.ledger.complete_operation(&caller, id);
        if let Err(err) = &result {
            debug!(operation_id = %id, error = %err, "Complete rejected");
        }
        self.metrics.record(SimAction::Complete, &result);
    }

    fn cancel(&mut self) {
        let id = self.pick_operation();
        let by_creator = self.rng.gen_bool(self.config.creator_cancel_ratio);
        let caller = match self.ledger.get_operation(id) {
            Ok(op) if by_creator => op.creator,
            _ => self.pick_actor(),
        };

        let result = self.ledger.cancel_operation(&caller, id);
        if let Err(err) = &result {
            debug!(operation_id = %id, error = %err, "Cancel rejected");
        }
        self.metrics.record(SimAction::Cancel, &result);
    }

    fn pick_actor(&mut self) -> AccountId {
        self.actors[self.rng.gen_range(0..self.actors.len())]
    }

    fn pick_asset(&mut self) -> AssetId {
        self.assets[self.rng.gen_range(0..self.assets.len())].clone()
    }

    /// Mostly an active operation; otherwise any id up to one past the end,
    /// so terminal and missing records get exercised too.
    fn pick_operation(&mut self) -> OperationId {
        let active = self.ledger.active_operations();
        if !active.is_empty() && self.rng.gen_bool(0.8) {
            return active[self.rng.gen_range(0..active.len())].id;
        }
        OperationId::new(self.rng.gen_range(0..=self.ledger.get_operation_count()))
    }
}

fn seeded_account(rng: &mut ChaCha8Rng) -> AccountId {
    AccountId::from_uuid(Uuid::from_u128(rng.gen::<u128>()))
}
