//! Configuration of the parasite genetics service.

use rand::Rng;
use rand_distr::{Distribution, Exp, Normal, Poisson};
use serde::{Deserialize, Serialize};

use super::layout::MAX_LOCATIONS;
use crate::error::EmodError;

/// How many sporozoites each oocyst yields when it bursts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Distribution")]
pub enum SporozoitesPerOocystDistribution {
    #[serde(rename = "CONSTANT_DISTRIBUTION")]
    Constant {
        #[serde(rename = "Constant")]
        value: f64,
    },
    #[serde(rename = "UNIFORM_DISTRIBUTION")]
    Uniform {
        #[serde(rename = "Min")]
        min: f64,
        #[serde(rename = "Max")]
        max: f64,
    },
    #[serde(rename = "GAUSSIAN_DISTRIBUTION")]
    Gaussian {
        #[serde(rename = "Mean")]
        mean: f64,
        #[serde(rename = "Std_Dev")]
        std_dev: f64,
    },
    #[serde(rename = "EXPONENTIAL_DISTRIBUTION")]
    Exponential {
        #[serde(rename = "Mean")]
        mean: f64,
    },
    #[serde(rename = "POISSON_DISTRIBUTION")]
    Poisson {
        #[serde(rename = "Mean")]
        mean: f64,
    },
}

impl Default for SporozoitesPerOocystDistribution {
    fn default() -> Self {
        SporozoitesPerOocystDistribution::Constant { value: 1.0 }
    }
}

impl SporozoitesPerOocystDistribution {
    fn invalid(message: String) -> EmodError {
        EmodError::InvalidParameter {
            name: "Sporozoites_Per_Oocyst_Distribution",
            message,
        }
    }

    pub fn validate(&self) -> Result<(), EmodError> {
        match *self {
            SporozoitesPerOocystDistribution::Constant { value } if !(value >= 0.0) => {
                Err(Self::invalid(format!("constant {value} must be non-negative")))
            }
            SporozoitesPerOocystDistribution::Uniform { min, max } if !(0.0 <= min && min <= max) => {
                Err(Self::invalid(format!("uniform range [{min}, {max}] is invalid")))
            }
            SporozoitesPerOocystDistribution::Gaussian { mean, std_dev }
                if !(mean >= 0.0 && std_dev >= 0.0) =>
            {
                Err(Self::invalid(format!(
                    "gaussian mean {mean} and standard deviation {std_dev} must be non-negative"
                )))
            }
            SporozoitesPerOocystDistribution::Exponential { mean }
            | SporozoitesPerOocystDistribution::Poisson { mean }
                if !(mean > 0.0) =>
            {
                Err(Self::invalid(format!("mean {mean} must be positive")))
            }
            _ => Ok(()),
        }
    }

    /// Draws a non-negative yield. Parameters are expected to have passed `validate`.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let value = match *self {
            SporozoitesPerOocystDistribution::Constant { value } => value,
            SporozoitesPerOocystDistribution::Uniform { min, max } => {
                if min < max {
                    rng.random_range(min..max)
                } else {
                    min
                }
            }
            SporozoitesPerOocystDistribution::Gaussian { mean, std_dev } => Normal::new(mean, std_dev)
                .map_or(mean, |normal| normal.sample(rng)),
            SporozoitesPerOocystDistribution::Exponential { mean } => {
                Exp::new(1.0 / mean).map_or(0.0, |exp| exp.sample(rng))
            }
            SporozoitesPerOocystDistribution::Poisson { mean } => {
                Poisson::new(mean).map_or(0.0, |poisson| poisson.sample(rng))
            }
        };
        value.max(0.0)
    }
}

/// Parameters of the parasite genetics service, named as in the EMOD configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneticsParams {
    /// Skips sporozoite mortality and recombination so that results match the model without
    /// parasite genetics.
    #[serde(rename = "Enable_FPG_Similarity_To_Base")]
    pub enable_fpg_similarity_to_base: bool,
    #[serde(rename = "Sporozoite_Life_Expectancy")]
    pub sporozoite_life_expectancy: f64,
    #[serde(rename = "Num_Sporozoites_In_Bite_Fail")]
    pub num_sporozoites_in_bite_fail: f64,
    #[serde(rename = "Probability_Sporozoite_In_Bite_Fails")]
    pub probability_sporozoite_in_bite_fails: f64,
    #[serde(rename = "Num_Oocyst_From_Bite_Fail")]
    pub num_oocyst_from_bite_fail: f64,
    #[serde(rename = "Probability_Oocyst_From_Bite_Fails")]
    pub probability_oocyst_from_bite_fails: f64,
    #[serde(rename = "Crossover_Gamma_K")]
    pub crossover_gamma_k: f64,
    #[serde(rename = "Crossover_Gamma_Theta")]
    pub crossover_gamma_theta: f64,
    #[serde(rename = "Sporozoites_Per_Oocyst_Distribution")]
    pub sporozoites_per_oocyst: SporozoitesPerOocystDistribution,
    /// 1-based genome positions, strictly ascending.
    #[serde(rename = "Barcode_Genome_Locations")]
    pub barcode_genome_locations: Vec<i32>,
    #[serde(rename = "Drug_Resistant_Genome_Locations")]
    pub drug_resistant_genome_locations: Vec<i32>,
    #[serde(rename = "HRP_Genome_Locations")]
    pub hrp_genome_locations: Vec<i32>,
}

impl Default for GeneticsParams {
    fn default() -> Self {
        GeneticsParams {
            enable_fpg_similarity_to_base: false,
            sporozoite_life_expectancy: 10.0,
            num_sporozoites_in_bite_fail: 12.0,
            probability_sporozoite_in_bite_fails: 0.5,
            num_oocyst_from_bite_fail: 3.0,
            probability_oocyst_from_bite_fails: 0.5,
            crossover_gamma_k: 2.0,
            crossover_gamma_theta: 0.38,
            sporozoites_per_oocyst: SporozoitesPerOocystDistribution::default(),
            barcode_genome_locations: Vec::new(),
            drug_resistant_genome_locations: Vec::new(),
            hrp_genome_locations: Vec::new(),
        }
    }
}

/// Bite draws repeat until they are non-zero, which never happens with a failure probability of 1.
const MAX_FAIL_PROBABILITY: f64 = 1.0 - f64::EPSILON;

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), EmodError> {
    if !(min..=max).contains(&value) {
        return Err(EmodError::InvalidParameter {
            name,
            message: format!("{value} is outside [{min}, {max}]"),
        });
    }
    Ok(())
}

fn check_locations(name: &'static str, locations: &[i32]) -> Result<(), EmodError> {
    if let Some(bad) = locations.iter().find(|&&l| !(1..=MAX_LOCATIONS).contains(&l)) {
        return Err(EmodError::InvalidParameter {
            name,
            message: format!("location {bad} is outside [1, {MAX_LOCATIONS}]"),
        });
    }
    if let Some(pair) = locations.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(EmodError::InvalidParameter {
            name,
            message: format!(
                "locations must be in ascending order without repeats; found {} before {}",
                pair[0], pair[1]
            ),
        });
    }
    Ok(())
}

fn check_disjoint(
    (name_a, a): (&'static str, &[i32]),
    (name_b, b): (&'static str, &[i32]),
) -> Result<(), EmodError> {
    if let Some(shared) = a.iter().find(|location| b.contains(location)) {
        return Err(EmodError::InvalidParameter {
            name: name_a,
            message: format!("location {shared} is also used by '{name_b}'"),
        });
    }
    Ok(())
}

impl GeneticsParams {
    pub fn validate(&self) -> Result<(), EmodError> {
        check_range(
            "Sporozoite_Life_Expectancy",
            self.sporozoite_life_expectancy,
            f64::from(f32::EPSILON),
            f64::MAX,
        )?;
        check_range(
            "Num_Sporozoites_In_Bite_Fail",
            self.num_sporozoites_in_bite_fail,
            f64::from(f32::EPSILON),
            f64::MAX,
        )?;
        check_range(
            "Probability_Sporozoite_In_Bite_Fails",
            self.probability_sporozoite_in_bite_fails,
            f64::from(f32::EPSILON),
            MAX_FAIL_PROBABILITY,
        )?;
        check_range(
            "Num_Oocyst_From_Bite_Fail",
            self.num_oocyst_from_bite_fail,
            f64::from(f32::EPSILON),
            f64::MAX,
        )?;
        check_range(
            "Probability_Oocyst_From_Bite_Fails",
            self.probability_oocyst_from_bite_fails,
            f64::from(f32::EPSILON),
            MAX_FAIL_PROBABILITY,
        )?;
        // Larger gamma parameters produce crossover distances far beyond the genome length.
        check_range("Crossover_Gamma_K", self.crossover_gamma_k, f64::from(f32::EPSILON), 10.0)?;
        check_range(
            "Crossover_Gamma_Theta",
            self.crossover_gamma_theta,
            f64::from(f32::EPSILON),
            10.0,
        )?;
        self.sporozoites_per_oocyst.validate()?;

        let barcode = ("Barcode_Genome_Locations", self.barcode_genome_locations.as_slice());
        let drug = (
            "Drug_Resistant_Genome_Locations",
            self.drug_resistant_genome_locations.as_slice(),
        );
        let hrp = ("HRP_Genome_Locations", self.hrp_genome_locations.as_slice());
        for (name, locations) in [barcode, drug, hrp] {
            check_locations(name, locations)?;
        }
        check_disjoint(barcode, drug)?;
        check_disjoint(barcode, hrp)?;
        check_disjoint(hrp, drug)?;
        Ok(())
    }

    /// Per-day sporozoite mortality rate.
    #[must_use]
    pub fn sporozoite_mortality_rate(&self) -> f64 {
        1.0 / self.sporozoite_life_expectancy
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = GeneticsParams::default();
        params.validate().unwrap();
        assert_eq!(params.sporozoite_mortality_rate(), 0.1);
    }

    #[test]
    fn deserialize_with_defaults() {
        let json = r#"{
            "Sporozoite_Life_Expectancy": 5.0,
            "Barcode_Genome_Locations": [1, 1000, 700000],
            "Sporozoites_Per_Oocyst_Distribution": {
                "Distribution": "GAUSSIAN_DISTRIBUTION",
                "Mean": 10000.0,
                "Std_Dev": 1000.0
            }
        }"#;
        let params: GeneticsParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.sporozoite_life_expectancy, 5.0);
        assert_eq!(params.crossover_gamma_k, 2.0);
        assert_eq!(params.barcode_genome_locations, vec![1, 1000, 700_000]);
        assert_eq!(
            params.sporozoites_per_oocyst,
            SporozoitesPerOocystDistribution::Gaussian {
                mean: 10000.0,
                std_dev: 1000.0
            }
        );
        params.validate().unwrap();
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<GeneticsParams, _> = serde_json::from_str(r#"{"Sporozoite_Life": 5.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_values() {
        let params = GeneticsParams {
            probability_oocyst_from_bite_fails: 0.0,
            ..GeneticsParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(EmodError::InvalidParameter {
                name: "Probability_Oocyst_From_Bite_Fails",
                ..
            })
        ));

        let params = GeneticsParams {
            probability_sporozoite_in_bite_fails: 1.0,
            ..GeneticsParams::default()
        };
        assert!(params.validate().is_err());

        let params = GeneticsParams {
            crossover_gamma_theta: 11.0,
            ..GeneticsParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn location_checks() {
        let params = GeneticsParams {
            barcode_genome_locations: vec![5, 3],
            ..GeneticsParams::default()
        };
        assert!(params.validate().is_err());

        let params = GeneticsParams {
            barcode_genome_locations: vec![0],
            ..GeneticsParams::default()
        };
        assert!(params.validate().is_err());

        let params = GeneticsParams {
            barcode_genome_locations: vec![10, 20],
            hrp_genome_locations: vec![20],
            ..GeneticsParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(EmodError::InvalidParameter {
                name: "Barcode_Genome_Locations",
                ..
            })
        ));
    }

    #[test]
    fn distribution_draws() {
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(SporozoitesPerOocystDistribution::default().draw(&mut rng), 1.0);

        let uniform = SporozoitesPerOocystDistribution::Uniform { min: 2.0, max: 4.0 };
        for _ in 0..100 {
            let value = uniform.draw(&mut rng);
            assert!((2.0..4.0).contains(&value));
        }

        let gaussian = SporozoitesPerOocystDistribution::Gaussian {
            mean: 0.0,
            std_dev: 5.0,
        };
        for _ in 0..100 {
            assert!(gaussian.draw(&mut rng) >= 0.0);
        }

        assert!(SporozoitesPerOocystDistribution::Poisson { mean: 0.0 }
            .validate()
            .is_err());
        assert!(SporozoitesPerOocystDistribution::Uniform { min: 3.0, max: 1.0 }
            .validate()
            .is_err());
    }
}
