use crate::VoiceGender;

/// A pair of neural voices for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePersona {
    pub language: &'static str,
    pub male: &'static str,
    pub female: &'static str,
}

impl VoicePersona {
    pub fn voice_for(&self, gender: VoiceGender) -> &'static str {
        match gender {
            VoiceGender::Male => self.male,
            VoiceGender::Female => self.female,
        }
    }
}

pub const DEFAULT_PERSONA: VoicePersona = VoicePersona {
    language: "default",
    male: "en-US-ChristopherNeural",
    female: "en-US-JennyNeural",
};

pub const PERSONAS: &[VoicePersona] = &[
    VoicePersona {
        language: "kn",
        male: "kn-IN-GaganNeural",
        female: "kn-IN-SapnaNeural",
    },
    VoicePersona {
        language: "te",
        male: "te-IN-MohanNeural",
        female: "te-IN-ShrutiNeural",
    },
    VoicePersona {
        language: "ta",
        male: "ta-IN-ValluvarNeural",
        female: "ta-IN-PallaviNeural",
    },
    VoicePersona {
        language: "ml",
        male: "ml-IN-MidhunNeural",
        female: "ml-IN-SobhanaNeural",
    },
    VoicePersona {
        language: "mr",
        male: "mr-IN-ManoharNeural",
        female: "mr-IN-AarohiNeural",
    },
    VoicePersona {
        language: "gu",
        male: "gu-IN-NiranjanNeural",
        female: "gu-IN-DhwaniNeural",
    },
    VoicePersona {
        language: "bn",
        male: "bn-BD-PradeepNeural",
        female: "bn-BD-NabanitaNeural",
    },
    VoicePersona {
        language: "ur",
        male: "ur-PK-UzairNeural",
        female: "ur-PK-UzmaNeural",
    },
];

/// Languages the cloning engine can speak.
pub const CLONING_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh", "ja", "ko", "hi",
];

/// Looks up the persona for `language`, falling back to [`DEFAULT_PERSONA`].
pub fn persona_for(language: &str) -> &'static VoicePersona {
    let language = language.trim();
    PERSONAS
        .iter()
        .find(|persona| persona.language.eq_ignore_ascii_case(language))
        .unwrap_or(&DEFAULT_PERSONA)
}
