
/// A learning resource suggested once a session touching the topic is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub url: &'static str,
    pub label: &'static str,
}

/// One entry of the Waves and Modern Physics catalog.
///
/// Topics are immutable and addressed by their position in [`CATALOG`].
#[derive(Debug, PartialEq, Eq)]
pub struct Topic {
    pub index: usize,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub resource: Resource,
}

/// How far a session got with a topic it has visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicMark {
    /// The topic currently under discussion.
    Current,
    /// The student answered the question about this topic.
    Answered,
    /// The student reported the topic has not been covered in class yet.
    Skipped,
}

/// A topic visited during a session together with its mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitedTopic {
    pub topic: &'static Topic,
    pub mark: TopicMark,
}

/// Returns the topic at `index`, if the catalog has one.
pub fn topic_at(index: usize) -> Option<&'static Topic> {
    CATALOG.get(index)
}

/// Normalises a persisted progress cursor. Students who completed the whole
/// catalog start over from the first topic.
pub fn starting_index(progress: usize) -> usize {
    if progress >= CATALOG.len() { 0 } else { progress }
}

/// Returns the next `count` topics starting at `start`, clipped to the catalog.
pub fn window(start: usize, count: usize) -> &'static [Topic] {
    let start = start.min(CATALOG.len());
    let end = start.saturating_add(count).min(CATALOG.len());
    &CATALOG[start..end]
}

pub static CATALOG: [Topic; 17] = [
    Topic {
        index: 0,
        name: "Simple Harmonic Motion",
        keywords: &[
            "oscillation",
            "restoring force",
            "equilibrium",
            "amplitude",
            "frequency",
            "period",
            "angular frequency",
            "displacement",
            "Hooke's law",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/mechanical-waves-and-sound/harmonic-motion/v/introduction-to-harmonic-motion",
            label: "Khan Academy — Intro to Harmonic Motion",
        },
    },
    Topic {
        index: 1,
        name: "Pendulum and Mass Spring",
        keywords: &[
            "pendulum",
            "mass-spring system",
            "spring constant",
            "period",
            "gravitational acceleration",
            "simple pendulum",
            "elastic potential energy",
            "natural frequency",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/mechanical-waves-and-sound/harmonic-motion/v/pendulum",
            label: "Khan Academy — Pendulums & Springs",
        },
    },
    Topic {
        index: 2,
        name: "Wave form",
        keywords: &[
            "wavelength",
            "amplitude",
            "frequency",
            "period",
            "crest",
            "trough",
            "transverse wave",
            "longitudinal wave",
            "wave speed",
        ],
        resource: Resource {
            url: "https://www.physicsclassroom.com/class/waves/Lesson-2/The-Anatomy-of-a-Wave",
            label: "The Physics Classroom — Anatomy of a Wave",
        },
    },
    Topic {
        index: 3,
        name: "Damped oscillation Damped Pendulum",
        keywords: &[
            "damping",
            "damped oscillation",
            "underdamped",
            "overdamped",
            "critical damping",
            "energy dissipation",
            "exponential decay",
            "damping coefficient",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/mechanical-waves-and-sound/harmonic-motion/a/what-is-damped-harmonic-motion",
            label: "Khan Academy — Damped Harmonic Motion",
        },
    },
    Topic {
        index: 4,
        name: "Waves on a string",
        keywords: &[
            "tension",
            "linear density",
            "wave speed",
            "pulse",
            "reflection",
            "transmission",
            "superposition",
            "boundary conditions",
        ],
        resource: Resource {
            url: "https://phet.colorado.edu/en/simulations/wave-on-a-string",
            label: "PhET Simulation — Wave on a String",
        },
    },
    Topic {
        index: 5,
        name: "Standing Waves",
        keywords: &[
            "nodes",
            "antinodes",
            "harmonics",
            "fundamental frequency",
            "resonance",
            "overtones",
            "standing wave pattern",
            "fixed end",
            "open end",
        ],
        resource: Resource {
            url: "https://www.physicsclassroom.com/class/sound/Lesson-4/Standing-Wave-Patterns",
            label: "The Physics Classroom — Standing Waves",
        },
    },
    Topic {
        index: 6,
        name: "Sound Waves",
        keywords: &[
            "compression",
            "rarefaction",
            "longitudinal wave",
            "speed of sound",
            "intensity",
            "decibels",
            "pitch",
            "frequency",
            "medium",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/mechanical-waves-and-sound/sound-topic/v/introduction-to-sound",
            label: "Khan Academy — Introduction to Sound",
        },
    },
    Topic {
        index: 7,
        name: "Doppler effect",
        keywords: &[
            "frequency shift",
            "source velocity",
            "observer velocity",
            "red shift",
            "blue shift",
            "approaching",
            "receding",
            "apparent frequency",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/mechanical-waves-and-sound/doppler-effect/v/doppler-effect-introduction",
            label: "Khan Academy — Doppler Effect",
        },
    },
    Topic {
        index: 8,
        name: "Musical instruments",
        keywords: &[
            "harmonics",
            "overtones",
            "resonance",
            "open pipe",
            "closed pipe",
            "standing waves",
            "fundamental",
            "timbre",
            "vibrating string",
        ],
        resource: Resource {
            url: "https://www.physicsclassroom.com/class/sound/Lesson-5/Musical-Instruments",
            label: "The Physics Classroom — Musical Instruments",
        },
    },
    Topic {
        index: 9,
        name: "Light as a wave",
        keywords: &[
            "electromagnetic wave",
            "wavelength",
            "frequency",
            "speed of light",
            "diffraction",
            "interference",
            "double-slit experiment",
            "wave-particle duality",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/light-waves/introduction-to-light-waves/v/introduction-to-light",
            label: "Khan Academy — Light as a Wave",
        },
    },
    Topic {
        index: 10,
        name: "Angular Resolution",
        keywords: &[
            "Rayleigh criterion",
            "diffraction limit",
            "aperture",
            "resolution",
            "angular separation",
            "single slit",
            "circular aperture",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/light-waves/interference-of-light-waves/v/single-slit-interference",
            label: "Khan Academy — Diffraction & Resolution",
        },
    },
    Topic {
        index: 11,
        name: "Thin film",
        keywords: &[
            "constructive interference",
            "destructive interference",
            "path difference",
            "refractive index",
            "phase change",
            "oil film",
            "soap bubble",
            "optical thickness",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/light-waves/interference-of-light-waves/v/thin-film-interference",
            label: "Khan Academy — Thin Film Interference",
        },
    },
    Topic {
        index: 12,
        name: "Polarization",
        keywords: &[
            "polarized light",
            "unpolarized light",
            "Malus's law",
            "polarizer",
            "analyzer",
            "Brewster's angle",
            "plane of polarization",
            "polarization by reflection",
        ],
        resource: Resource {
            url: "https://www.physicsclassroom.com/class/light/Lesson-1/Polarization",
            label: "The Physics Classroom — Polarization",
        },
    },
    Topic {
        index: 13,
        name: "Thermal Physics Black body",
        keywords: &[
            "blackbody radiation",
            "Stefan-Boltzmann law",
            "Wien's law",
            "Planck's law",
            "thermal equilibrium",
            "emissivity",
            "peak wavelength",
            "ultraviolet catastrophe",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/quantum-physics/photons/v/blackbody-radiation",
            label: "Khan Academy — Blackbody Radiation",
        },
    },
    Topic {
        index: 14,
        name: "Light as a particle",
        keywords: &[
            "photon",
            "photoelectric effect",
            "work function",
            "threshold frequency",
            "Planck's constant",
            "photon energy",
            "wave-particle duality",
            "Einstein",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/quantum-physics/photons/v/photoelectric-effect",
            label: "Khan Academy — Photoelectric Effect",
        },
    },
    Topic {
        index: 15,
        name: "Radioactivity",
        keywords: &[
            "alpha decay",
            "beta decay",
            "gamma radiation",
            "half-life",
            "nuclear decay",
            "isotopes",
            "radioactive decay",
            "binding energy",
            "mass defect",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/quantum-physics/in-in-nuclear-physics/v/types-of-decay",
            label: "Khan Academy — Radioactive Decay",
        },
    },
    Topic {
        index: 16,
        name: "Relativity",
        keywords: &[
            "time dilation",
            "length contraction",
            "speed of light",
            "Lorentz factor",
            "mass-energy equivalence",
            "E=mc²",
            "reference frame",
            "special relativity",
        ],
        resource: Resource {
            url: "https://www.khanacademy.org/science/physics/special-relativity/einstein-velocity-addition/v/einstein-velocity-addition",
            label: "Khan Academy — Special Relativity",
        },
    },
];
