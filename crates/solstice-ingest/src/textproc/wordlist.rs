//! Embedded frequency word list.
//!
//! A compact general-English frequency list plus a medical/vaccine terms
//! list with elevated frequencies, shared by the dictionary corrector and
//! the fallback splitter. Frequencies are relative weights, not corpus
//! counts.

/// General-English words with rough relative frequencies.
pub(crate) const COMMON_WORDS: &[(&str, u64)] = &[
    ("the", 23_000_000),
    ("of", 13_000_000),
    ("and", 12_000_000),
    ("to", 11_000_000),
    ("in", 8_000_000),
    ("a", 8_000_000),
    ("is", 4_000_000),
    ("that", 3_900_000),
    ("for", 3_800_000),
    ("it", 3_700_000),
    ("was", 3_600_000),
    ("on", 3_300_000),
    ("are", 3_200_000),
    ("as", 3_100_000),
    ("with", 3_000_000),
    ("be", 2_900_000),
    ("by", 2_800_000),
    ("at", 2_700_000),
    ("this", 2_600_000),
    ("have", 2_500_000),
    ("from", 2_400_000),
    ("or", 2_300_000),
    ("had", 2_100_000),
    ("not", 2_000_000),
    ("but", 1_900_000),
    ("were", 1_800_000),
    ("which", 1_700_000),
    ("all", 1_600_000),
    ("their", 1_500_000),
    ("an", 1_500_000),
    ("there", 1_400_000),
    ("been", 1_300_000),
    ("one", 1_300_000),
    ("more", 1_200_000),
    ("when", 1_100_000),
    ("who", 1_100_000),
    ("no", 1_000_000),
    ("after", 990_000),
    ("than", 980_000),
    ("may", 950_000),
    ("other", 930_000),
    ("each", 900_000),
    ("between", 880_000),
    ("during", 860_000),
    ("both", 840_000),
    ("two", 820_000),
    ("these", 800_000),
    ("first", 780_000),
    ("any", 760_000),
    ("also", 740_000),
    ("among", 720_000),
    ("within", 700_000),
    ("three", 680_000),
    ("per", 660_000),
    ("over", 640_000),
    ("under", 620_000),
    ("results", 600_000),
    ("study", 590_000),
    ("group", 580_000),
    ("table", 570_000),
    ("figure", 560_000),
    ("data", 550_000),
    ("number", 540_000),
    ("total", 530_000),
    ("percent", 520_000),
    ("compared", 510_000),
    ("reported", 500_000),
    ("received", 490_000),
    ("including", 480_000),
    ("following", 470_000),
    ("based", 460_000),
    ("observed", 450_000),
    ("overall", 440_000),
    ("analysis", 430_000),
    ("months", 420_000),
    ("years", 410_000),
    ("days", 400_000),
    ("day", 395_000),
    ("week", 390_000),
    ("weeks", 385_000),
    ("age", 380_000),
    ("aged", 375_000),
    ("children", 370_000),
    ("adults", 365_000),
    ("older", 360_000),
    ("subjects", 355_000),
    ("participants", 350_000),
    ("patients", 345_000),
    ("rate", 340_000),
    ("rates", 335_000),
    ("higher", 330_000),
    ("lower", 325_000),
    ("similar", 320_000),
    ("significant", 315_000),
    ("significantly", 310_000),
    ("versus", 305_000),
    ("respectively", 300_000),
    ("baseline", 295_000),
    ("endpoint", 290_000),
    ("primary", 285_000),
    ("secondary", 280_000),
    ("outcome", 275_000),
    ("outcomes", 270_000),
    ("measure", 265_000),
    ("measures", 260_000),
    ("evidence", 255_000),
    ("confidence", 250_000),
    ("interval", 245_000),
    ("ratio", 240_000),
    ("mean", 235_000),
    ("median", 230_000),
    ("range", 225_000),
    ("standard", 220_000),
    ("deviation", 215_000),
    ("error", 210_000),
    ("estimate", 205_000),
    ("estimated", 200_000),
    ("approximately", 195_000),
    ("increase", 190_000),
    ("increased", 185_000),
    ("decrease", 180_000),
    ("decreased", 175_000),
    ("response", 170_000),
    ("responses", 165_000),
    ("effect", 160_000),
    ("effects", 155_000),
    ("adverse", 150_000),
    ("event", 148_000),
    ("events", 146_000),
    ("serious", 144_000),
    ("severe", 142_000),
    ("mild", 140_000),
    ("moderate", 138_000),
    ("local", 136_000),
    ("systemic", 134_000),
    ("reaction", 132_000),
    ("reactions", 130_000),
    ("pain", 128_000),
    ("fever", 126_000),
    ("site", 124_000),
    ("injection", 122_000),
    ("season", 120_000),
    ("seasonal", 118_000),
    ("year", 116_000),
    ("against", 112_000),
    ("protection", 110_000),
    ("protective", 108_000),
    ("licensed", 106_000),
    ("approved", 104_000),
    ("recommended", 102_000),
    ("administration", 100_000),
    ("administered", 98_000),
    ("indication", 96_000),
    ("indicated", 94_000),
    ("information", 92_000),
    ("prescribing", 90_000),
    ("clinical", 88_000),
    ("trial", 86_000),
    ("trials", 84_000),
    ("randomized", 82_000),
    ("controlled", 80_000),
    ("placebo", 78_000),
    ("blind", 76_000),
    ("efficacy", 74_000),
    ("effectiveness", 72_000),
    ("safety", 70_000),
    ("health", 68_000),
    ("disease", 66_000),
    ("diseases", 64_000),
    ("infection", 62_000),
    ("infections", 60_000),
    ("respiratory", 58_000),
    ("illness", 56_000),
    ("symptoms", 54_000),
    ("prevention", 52_000),
    ("prevent", 50_000),
    ("population", 48_000),
    ("populations", 46_000),
    ("risk", 44_000),
    ("groups", 42_000),
    ("active", 40_000),
    ("control", 38_000),
    ("comparator", 36_000),
    ("formulation", 34_000),
    ("manufactured", 32_000),
    ("manufacturer", 30_000),
    ("storage", 28_000),
    ("supplied", 26_000),
    ("section", 24_000),
    ("page", 22_000),
    ("see", 20_000),
    ("use", 19_000),
    ("used", 18_000),
    ("using", 17_000),
    ("should", 16_000),
    ("must", 15_000),
    ("can", 14_000),
    ("will", 13_000),
    ("about", 12_000),
    ("into", 11_000),
    ("through", 10_000),
];

/// Medical/vaccine terms seeded with elevated frequencies so corrections
/// prefer them over general-English near-misses.
pub(crate) const MEDICAL_TERMS: &[(&str, u64)] = &[
    ("vaccine", 6_000_000),
    ("vaccines", 5_500_000),
    ("vaccination", 5_200_000),
    ("vaccinated", 5_000_000),
    ("influenza", 6_000_000),
    ("dose", 5_800_000),
    ("doses", 5_400_000),
    ("dosage", 4_800_000),
    ("antigen", 4_600_000),
    ("antigens", 4_400_000),
    ("antibody", 4_600_000),
    ("antibodies", 4_400_000),
    ("titer", 4_200_000),
    ("titers", 4_000_000),
    ("hemagglutinin", 4_200_000),
    ("hemagglutination", 4_000_000),
    ("neuraminidase", 3_800_000),
    ("immunogenicity", 4_800_000),
    ("immunization", 4_600_000),
    ("immunized", 4_200_000),
    ("immune", 4_400_000),
    ("immunity", 4_200_000),
    ("seroconversion", 3_800_000),
    ("seroprotection", 3_600_000),
    ("quadrivalent", 4_400_000),
    ("trivalent", 4_200_000),
    ("intramuscular", 3_800_000),
    ("intradermal", 3_400_000),
    ("subcutaneous", 3_400_000),
    ("strain", 4_000_000),
    ("strains", 3_800_000),
    ("virus", 4_400_000),
    ("viruses", 4_200_000),
    ("viral", 4_000_000),
    ("pediatric", 3_800_000),
    ("geriatric", 3_400_000),
    ("erythema", 3_200_000),
    ("induration", 3_000_000),
    ("myalgia", 3_200_000),
    ("arthralgia", 3_000_000),
    ("headache", 3_600_000),
    ("malaise", 3_200_000),
    ("pyrexia", 3_000_000),
    ("nasopharyngitis", 2_800_000),
    ("anaphylaxis", 3_000_000),
    ("hypersensitivity", 3_200_000),
    ("contraindication", 3_200_000),
    ("contraindications", 3_000_000),
    ("syncope", 2_800_000),
    ("guillain", 2_600_000),
    ("syndrome", 3_400_000),
    ("thimerosal", 2_800_000),
    ("preservative", 3_000_000),
    ("adjuvant", 3_200_000),
    ("formaldehyde", 2_800_000),
    ("ovalbumin", 2_600_000),
    ("microgram", 3_000_000),
    ("micrograms", 2_900_000),
    ("milliliter", 2_900_000),
    ("syringe", 3_200_000),
    ("vial", 3_200_000),
    ("placebo", 3_600_000),
    ("cohort", 3_400_000),
    ("enrolled", 3_400_000),
    ("enrollment", 3_200_000),
    ("randomization", 3_200_000),
    ("postvaccination", 2_800_000),
    ("prevaccination", 2_600_000),
    ("solicited", 3_000_000),
    ("unsolicited", 2_800_000),
];

/// Full corpus (general + medical) in one deterministic list.
pub(crate) fn entries() -> Vec<(&'static str, u64)> {
    let mut all = Vec::with_capacity(COMMON_WORDS.len() + MEDICAL_TERMS.len());
    all.extend_from_slice(COMMON_WORDS);
    all.extend_from_slice(MEDICAL_TERMS);
    all
}
