//! Damage and chorus formulas. Rhythm accuracy scales attack output up and
//! incoming damage down.

/// Multiplier applied to a chorus-enhanced attack.
pub const ENHANCED_MULTIPLIER: f64 = 1.5;
/// Defense soft-cap constant: mitigation = 100 / (100 + defense).
pub const DEFENSE_SCALE: f64 = 100.0;
/// Chorus credited per point of accuracy on a basic attack.
pub const CHORUS_GAIN_RATE: f64 = 15.0;

const ATTACK_RHYTHM_FLOOR: f64 = 0.6;
const ATTACK_RHYTHM_SCALE: f64 = 0.9;
const DEFENSE_RHYTHM_CEIL: f64 = 1.4;
const DEFENSE_RHYTHM_SCALE: f64 = 0.8;

pub fn defense_factor(defense: f64) -> f64 {
    DEFENSE_SCALE / (DEFENSE_SCALE + defense)
}

/// Player attack: accuracy 0 still lands 60% of base, accuracy 1 reaches
/// 150%.
pub fn player_attack(base_power: f64, enhanced: bool, target_defense: f64, accuracy: f64) -> f64 {
    let final_power = base_power * if enhanced { ENHANCED_MULTIPLIER } else { 1.0 };
    let rhythm_factor = ATTACK_RHYTHM_FLOOR + ATTACK_RHYTHM_SCALE * accuracy;
    final_power * defense_factor(target_defense) * rhythm_factor
}

/// Enemy attack resolved through the defense minigame: a perfect defense
/// drops incoming damage to 60%, a total miss raises it to 140%.
pub fn enemy_attack(attack_power: f64, target_defense: f64, accuracy: f64) -> f64 {
    let rhythm_factor = DEFENSE_RHYTHM_CEIL - DEFENSE_RHYTHM_SCALE * accuracy;
    attack_power * defense_factor(target_defense) * rhythm_factor
}

/// Chorus credited after a basic (non-enhanced) attack.
pub fn chorus_gain(accuracy: f64) -> u32 {
    (accuracy.clamp(0.0, 1.0) * CHORUS_GAIN_RATE).round() as u32
}
